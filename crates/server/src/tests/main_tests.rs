use super::*;
use axum::{body, body::Body, http::Request};
use tower::ServiceExt;

async fn test_app() -> (Router, tempfile::TempDir) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.seed_demo_data().await.expect("seed");
    let upload_root = tempfile::tempdir().expect("tempdir");

    let api = ApiContext {
        storage,
        mailer: Arc::new(DisabledMailer),
        settings: ServiceSettings {
            upload_dir: upload_root.path().join("images"),
            restock_recipient: None,
        },
    };
    (build_router(Arc::new(AppState { api })), upload_root)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body)
}

fn get_req(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn post_req(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn healthz_and_hello_answer_plain_text() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, get_req("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), b"ok");

    let (status, body) = send(&app, get_req("/api/hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), b"Hello World");
}

#[tokio::test]
async fn categories_route_lists_seeded_catalog() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, get_req("/api/categories")).await;
    assert_eq!(status, StatusCode::OK);
    let categories: Vec<Category> = serde_json::from_slice(&body).expect("json");
    let labels: Vec<&str> = categories.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Cardiologie", "Douleur"]);
    assert_eq!(categories[1].medicines.len(), 3);

    let (status, body) = send(&app, get_req("/api/categories/search?q=leur")).await;
    assert_eq!(status, StatusCode::OK);
    let found: Vec<Category> = serde_json::from_slice(&body).expect("json");
    assert_eq!(found.len(), 1);

    let (status, body) = send(&app, get_req("/api/categories/count")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("There are 2 categories"));

    let (status, body) = send(&app, get_req("/api/categories/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ApiError = serde_json::from_slice(&body).expect("json");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn add_category_maps_validation_and_conflict() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, get_req("/api/categories/add?label=Vaccins")).await;
    assert_eq!(status, StatusCode::OK);
    let created: Category = serde_json::from_slice(&body).expect("json");
    assert_eq!(created.description.as_deref(), Some("Description non fournie"));

    let (status, _) = send(
        &app,
        post_req("/api/categories/add?label=Vaccins&description=bis"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, post_req("/api/categories/add?label=%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_routes_cover_the_lifecycle() {
    let (app, _dir) = test_app().await;

    let (status, body) = send(&app, post_req("/api/orders/for/DSP01")).await;
    assert_eq!(status, StatusCode::OK);
    let order: OrderDetails = serde_json::from_slice(&body).expect("json");
    assert_eq!(order.dispensary.code.as_str(), "DSP01");

    let (_, body) = send(&app, get_req("/api/medicines/available")).await;
    let medicines: Vec<Medicine> = serde_json::from_slice(&body).expect("json");
    let tahor = medicines
        .iter()
        .find(|m| m.summary.name == "Tahor")
        .expect("seeded medicine");
    let reference = tahor.summary.reference.0;

    let (status, body) = send(
        &app,
        post_req(&format!(
            "/api/orders/lines?order={}&medicine={reference}&quantity=2",
            order.number.0
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let line: LineDetails = serde_json::from_slice(&body).expect("json");

    let (status, _) = send(
        &app,
        post_req(&format!(
            "/api/orders/lines?order={}&medicine={reference}&quantity=1000",
            order.number.0
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get_req("/api/orders/pending/DSP01")).await;
    assert_eq!(status, StatusCode::OK);
    let pending: Vec<OrderHeader> = serde_json::from_slice(&body).expect("json");
    assert_eq!(pending.len(), 1);

    let delete = Request::delete(format!("/api/orders/lines/{}", line.id.0))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, get_req(&format!("/api/orders/{}", order.number.0))).await;
    assert_eq!(status, StatusCode::OK);
    let details: OrderDetails = serde_json::from_slice(&body).expect("json");
    assert!(details.lines.is_empty());

    let ship = format!("/api/orders/{}/ship", order.number.0);
    let (status, _) = send(&app, post_req(&ship)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, post_req(&ship)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_slice(&body).expect("json");
    assert_eq!(err.code, ErrorCode::IllegalState);

    let (status, _) = send(&app, get_req("/api/orders/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, post_req("/api/orders/for/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_come_as_objects_and_rows() {
    let (app, _dir) = test_app().await;
    let (_, body) = send(&app, get_req("/api/categories")).await;
    let categories: Vec<Category> = serde_json::from_slice(&body).expect("json");
    let douleur = &categories[1];
    let doliprane = douleur.medicines[0].reference.0;

    let (_, body) = send(&app, post_req("/api/orders/for/DSP02")).await;
    let order: OrderDetails = serde_json::from_slice(&body).expect("json");
    send(
        &app,
        post_req(&format!(
            "/api/orders/lines?order={}&medicine={doliprane}&quantity=2",
            order.number.0
        )),
    )
    .await;

    let (status, body) = send(
        &app,
        get_req(&format!("/api/stats/units-ordered/{}", douleur.code.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stats: Vec<UnitsPerMedicine> = serde_json::from_slice(&body).expect("json");
    assert!(stats.iter().any(|s| s.name == "Doliprane" && s.units == 2));

    let (status, body) = send(
        &app,
        get_req(&format!("/api/stats/units-ordered/{}/rows", douleur.code.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(rows[0], serde_json::json!(["Doliprane", 2]));
}

#[tokio::test]
async fn restock_returns_text_report() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, post_req("/api/restock")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("Mail simulated for Pfizer (1 medicines)"));
    assert!(text.ends_with("Restock finished. 4 mail(s) sent or simulated."));
}

#[tokio::test]
async fn uploaded_image_is_served_back() {
    let (app, _dir) = test_app().await;
    let upload = Request::post("/api/medicines/1/image?filename=box.png")
        .header("content-type", "image/png")
        .body(Body::from(vec![0x89, b'P', b'N', b'G']))
        .expect("request");
    let (status, body) = send(&app, upload).await;
    assert_eq!(status, StatusCode::OK);
    let uploaded: ImageUploadResponse = serde_json::from_slice(&body).expect("json");

    let response = app
        .clone()
        .oneshot(get_req(&uploaded.image_url))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        "image/png"
    );

    let (status, _) = send(&app, get_req("/images/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let text = Request::post("/api/medicines/1/image")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .expect("request");
    let (status, _) = send(&app, text).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let (app, _dir) = test_app().await;
    let request = Request::get("/api/categories")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("cors header"),
        "*"
    );
}

#[test]
fn error_codes_map_to_http_statuses() {
    assert_eq!(status_for(ErrorCode::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for(ErrorCode::Validation), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(ErrorCode::IllegalState), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(ErrorCode::Conflict), StatusCode::CONFLICT);
    assert_eq!(
        status_for(ErrorCode::Internal),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn log_filter_honours_rust_log_and_defaults_to_info() {
    assert_eq!(log_filter(None).to_string(), "info");
    assert_eq!(
        log_filter(Some("server=debug")).to_string(),
        "server=debug"
    );
}
