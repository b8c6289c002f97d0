use super::*;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use shared::domain::{CategoryHeader, MedicineSummary};
use tokio::net::TcpListener;

fn summary(reference: i64, name: &str) -> MedicineSummary {
    MedicineSummary {
        reference: MedicineRef(reference),
        name: name.into(),
        quantity_per_unit: "Une boîte de 12".into(),
        unit_price: 10.0,
        units_in_stock: 20,
        units_ordered: 0,
        reorder_level: 5,
        unavailable: false,
        image_url: None,
    }
}

async fn spawn_pharmacy_stub() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route(
            "/api/categories",
            get(|| async {
                Json(vec![Category {
                    code: CategoryCode(1),
                    label: "Douleur".into(),
                    description: None,
                    medicines: vec![summary(7, "Doliprane")],
                }])
            }),
        )
        .route(
            "/api/medicines/available",
            get(|| async {
                Json(vec![Medicine {
                    summary: summary(7, "Doliprane"),
                    category: CategoryHeader {
                        code: CategoryCode(1),
                        label: "Douleur".into(),
                    },
                }])
            }),
        )
        .route(
            "/api/orders/lines",
            post(|Query(q): Query<AddLineQuery>| async move {
                if q.quantity > 20 {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        Json(ApiError::new(ErrorCode::IllegalState, "not enough stock")),
                    ));
                }
                Ok(Json(LineDetails {
                    id: LineId(3),
                    medicine: summary(q.medicine, "Doliprane"),
                    quantity: q.quantity,
                }))
            }),
        )
        .route(
            "/api/orders/lines/:id",
            delete(|Path(_id): Path<i64>| async { StatusCode::NO_CONTENT }),
        )
        .route(
            "/api/orders/:number",
            get(|Path(number): Path<i64>| async move {
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiError::not_found(format!("order {number} not found"))),
                )
            }),
        )
        .route(
            "/api/restock",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/")
}

fn api_code(err: &anyhow::Error) -> ErrorCode {
    err.downcast_ref::<ApiException>()
        .expect("api exception")
        .code
}

#[tokio::test]
async fn reads_catalog_endpoints() {
    let client = PharmacyClient::new(spawn_pharmacy_stub().await);
    client.health().await.expect("health");

    let categories = client.categories().await.expect("categories");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].medicines[0].name, "Doliprane");

    let medicines = client.available_medicines().await.expect("medicines");
    assert_eq!(medicines[0].category.label, "Douleur");
}

#[tokio::test]
async fn add_line_sends_query_and_maps_server_errors() {
    let client = PharmacyClient::new(spawn_pharmacy_stub().await);

    let line = client
        .add_line(OrderNumber(1), MedicineRef(7), 4)
        .await
        .expect("line");
    assert_eq!(line.quantity, 4);
    assert_eq!(line.medicine.reference, MedicineRef(7));

    let err = client
        .add_line(OrderNumber(1), MedicineRef(7), 50)
        .await
        .expect_err("stock");
    assert_eq!(api_code(&err), ErrorCode::IllegalState);

    client.remove_line(line.id).await.expect("remove");
}

#[tokio::test]
async fn not_found_keeps_server_error_code() {
    let client = PharmacyClient::new(spawn_pharmacy_stub().await);
    let err = client.order(OrderNumber(9)).await.expect_err("missing");
    assert_eq!(api_code(&err), ErrorCode::NotFound);
    assert!(err.to_string().contains("order 9 not found"));
}

#[tokio::test]
async fn non_json_error_body_becomes_internal() {
    let client = PharmacyClient::new(spawn_pharmacy_stub().await);
    let err = client.restock().await.expect_err("bad gateway");
    assert_eq!(api_code(&err), ErrorCode::Internal);
    assert!(err.to_string().contains("upstream down"));
}
