use shared::domain::DispensaryCode;
use storage::{AddLineOutcome, SeedOutcome, ShipOrderOutcome, Storage};

#[tokio::test]
async fn seeded_catalog_and_shipped_order_survive_reopen() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("pharmacy.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let order_number = {
        let storage = Storage::new(&database_url).await.expect("open");
        assert!(matches!(
            storage.seed_demo_data().await.expect("seed"),
            SeedOutcome::Seeded { .. }
        ));

        let tahor = storage
            .list_medicines()
            .await
            .expect("medicines")
            .into_iter()
            .find(|m| m.summary.name == "Tahor")
            .expect("seeded medicine");
        let order = storage
            .create_order(&DispensaryCode::new("DSP01"), 0.0)
            .await
            .expect("order")
            .expect("seeded dispensary");
        let outcome = storage
            .add_order_line(order.number, tahor.summary.reference, 4)
            .await
            .expect("line");
        assert!(matches!(outcome, AddLineOutcome::Added(_)));
        assert!(matches!(
            storage.ship_order(order.number).await.expect("ship"),
            ShipOrderOutcome::Shipped(_)
        ));
        order.number
    };

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened.seed_demo_data().await.expect("seed"),
        SeedOutcome::AlreadyPopulated
    );
    let order = reopened
        .order(order_number)
        .await
        .expect("order")
        .expect("persisted");
    assert!(order.is_shipped());
    let lines = reopened.order_lines(order_number).await.expect("lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].medicine.units_in_stock, 16);
    assert_eq!(
        reopened
            .shipped_articles_for(&DispensaryCode::new("DSP01"))
            .await
            .expect("sum"),
        4
    );
}
