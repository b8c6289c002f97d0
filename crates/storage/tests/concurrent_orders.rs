use shared::domain::{Dispensary, DispensaryCode, PostalAddress};
use storage::{AddLineOutcome, NewMedicine, Storage};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_line_additions_all_succeed_on_file_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("pharmacy.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let storage = Storage::new(&database_url).await.expect("open");

    let category = storage
        .create_category("Antalgiques", None)
        .await
        .expect("category");
    let medicine = storage
        .create_medicine(&NewMedicine::new("Doliprane", category).with_stock(1_000, 10))
        .await
        .expect("medicine");
    let code = DispensaryCode::new("DSP01");
    storage
        .create_dispensary(&Dispensary {
            code: code.clone(),
            name: "Dispensaire du Centre".into(),
            contact: None,
            title: None,
            address: PostalAddress::default(),
            phone: None,
            fax: None,
        })
        .await
        .expect("dispensary");
    let order = storage
        .create_order(&code, 0.0)
        .await
        .expect("order")
        .expect("known dispensary");

    let number = order.number;
    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.add_order_line(number, medicine, 1).await })
        })
        .collect();
    for task in tasks {
        let outcome = task.await.expect("join").expect("add line");
        assert!(matches!(outcome, AddLineOutcome::Added(_)), "{outcome:?}");
    }

    let lines = storage.order_lines(number).await.expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 40);
    let medicine = storage
        .medicine(medicine)
        .await
        .expect("medicine")
        .expect("exists");
    assert_eq!(medicine.summary.units_ordered, 40);
}
