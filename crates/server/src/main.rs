use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{ApiContext, DisabledMailer, ImageUpload, Mailer, ServiceSettings};
use shared::{
    domain::{
        Category, CategoryCode, Dispensary, DispensaryCode, LineId, Medicine, MedicineRef,
        OrderNumber,
    },
    error::{ApiError, ErrorCode},
    protocol::{
        AddCategoryQuery, AddLineQuery, ImageUploadResponse, LineDetails, OrderDetails,
        OrderHeader, UnitsPerMedicine,
    },
};
use storage::{SeedOutcome, Storage};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod mailer;

use app_state::AppState;
use config::{load_settings, prepare_database_url};
use mailer::MailgunMailer;

const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

type HttpError = (StatusCode, Json<ApiError>);
type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
struct ImageQuery {
    filename: Option<String>,
}

/// `RUST_LOG` directives when they parse, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if settings.seed_demo_data {
        match storage.seed_demo_data().await? {
            SeedOutcome::Seeded {
                categories,
                medicines,
            } => info!(categories, medicines, "demo data seeded"),
            SeedOutcome::AlreadyPopulated => info!("catalog already populated, seeding skipped"),
        }
    }

    let mailer: Arc<dyn Mailer> = match settings.mailgun.clone() {
        Some(mailgun) => {
            info!(domain = %mailgun.domain, "restock mails go through mailgun");
            Arc::new(MailgunMailer::new(mailgun))
        }
        None => {
            warn!("no mailgun settings, restock mails will be simulated");
            Arc::new(DisabledMailer)
        }
    };
    let api = ApiContext {
        storage,
        mailer,
        settings: ServiceSettings {
            upload_dir: PathBuf::from(&settings.upload_dir),
            restock_recipient: settings.restock_recipient.clone(),
        },
    };

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/hello", get(hello))
        .route("/api/categories", get(http_list_categories))
        .route("/api/categories/search", get(http_search_categories))
        .route(
            "/api/categories/add",
            get(http_add_category).post(http_add_category),
        )
        .route("/api/categories/count", get(http_count_categories))
        .route("/api/categories/:code", get(http_get_category))
        .route("/api/medicines", get(http_list_medicines))
        .route("/api/medicines/available", get(http_available_medicines))
        .route("/api/medicines/:reference", get(http_get_medicine))
        .route("/api/medicines/:reference/image", post(upload_image))
        .route("/images/:file", get(serve_image))
        .route("/api/dispensaries", get(http_list_dispensaries))
        .route("/api/dispensaries/:code", get(http_get_dispensary))
        .route("/api/orders/for/:dispensary_code", post(http_create_order))
        .route("/api/orders/lines", post(http_add_line))
        .route("/api/orders/lines/:id", delete(http_remove_line))
        .route(
            "/api/orders/pending/:dispensary_code",
            get(http_pending_orders),
        )
        .route("/api/orders/:number", get(http_get_order))
        .route("/api/orders/:number/ship", post(http_ship_order))
        .route("/api/stats/units-ordered/:category", get(http_units_ordered))
        .route(
            "/api/stats/units-ordered/:category/rows",
            get(http_units_ordered_rows),
        )
        .route("/api/restock", post(http_restock))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation | ErrorCode::IllegalState => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    (status_for(err.code), Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> HttpResult<&'static str> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn hello() -> &'static str {
    "Hello World"
}

async fn http_list_categories(State(state): State<Arc<AppState>>) -> HttpResult<Json<Vec<Category>>> {
    let categories = server_api::list_categories(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(categories))
}

async fn http_search_categories(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> HttpResult<Json<Vec<Category>>> {
    let categories = server_api::search_categories(&state.api, &q.q)
        .await
        .map_err(http_error)?;
    Ok(Json(categories))
}

async fn http_get_category(
    State(state): State<Arc<AppState>>,
    Path(code): Path<i64>,
) -> HttpResult<Json<Category>> {
    let category = server_api::get_category(&state.api, CategoryCode(code))
        .await
        .map_err(http_error)?;
    Ok(Json(category))
}

async fn http_add_category(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AddCategoryQuery>,
) -> HttpResult<Json<Category>> {
    let category = server_api::add_category(&state.api, &q.label, q.description.as_deref())
        .await
        .map_err(http_error)?;
    Ok(Json(category))
}

async fn http_count_categories(State(state): State<Arc<AppState>>) -> HttpResult<Html<String>> {
    let count = server_api::count_categories(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Html(format!(
        "<h1>There are {count} categories in the database</h1>"
    )))
}

async fn http_list_medicines(State(state): State<Arc<AppState>>) -> HttpResult<Json<Vec<Medicine>>> {
    let medicines = server_api::list_medicines(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(medicines))
}

async fn http_available_medicines(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Json<Vec<Medicine>>> {
    let medicines = server_api::available_medicines(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(medicines))
}

async fn http_get_medicine(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<i64>,
) -> HttpResult<Json<Medicine>> {
    let medicine = server_api::get_medicine(&state.api, MedicineRef(reference))
        .await
        .map_err(http_error)?;
    Ok(Json(medicine))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<i64>,
    Query(q): Query<ImageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Json<ImageUploadResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let upload = ImageUpload {
        file_name: q.filename.filter(|name| !name.trim().is_empty()),
        content_type,
        bytes: body.to_vec(),
    };
    let response = server_api::store_medicine_image(&state.api, MedicineRef(reference), upload)
        .await
        .map_err(http_error)?;
    Ok(Json(response))
}

async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> HttpResult<impl IntoResponse> {
    let not_found = || http_error(ApiError::not_found(format!("image {file} not found")));
    if !server_api::is_safe_image_name(&file) {
        return Err(not_found());
    }
    let bytes = match tokio::fs::read(state.upload_dir().join(&file)).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(err) => {
            error!(error = %err, %file, "image read failed");
            return Err(http_error(ApiError::new(ErrorCode::Internal, err.to_string())));
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(image_content_type(&file)),
    );
    Ok((StatusCode::OK, headers, bytes))
}

fn image_content_type(file: &str) -> &'static str {
    let extension = file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

async fn http_list_dispensaries(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Json<Vec<Dispensary>>> {
    let dispensaries = server_api::list_dispensaries(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(dispensaries))
}

async fn http_get_dispensary(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> HttpResult<Json<Dispensary>> {
    let dispensary = server_api::get_dispensary(&state.api, &DispensaryCode(code))
        .await
        .map_err(http_error)?;
    Ok(Json(dispensary))
}

async fn http_create_order(
    State(state): State<Arc<AppState>>,
    Path(dispensary_code): Path<String>,
) -> HttpResult<Json<OrderDetails>> {
    let order = server_api::create_order(&state.api, &DispensaryCode(dispensary_code))
        .await
        .map_err(http_error)?;
    Ok(Json(order))
}

async fn http_add_line(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AddLineQuery>,
) -> HttpResult<Json<LineDetails>> {
    let line = server_api::add_line(
        &state.api,
        OrderNumber(q.order),
        MedicineRef(q.medicine),
        q.quantity,
    )
    .await
    .map_err(http_error)?;
    Ok(Json(line))
}

async fn http_remove_line(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> HttpResult<StatusCode> {
    server_api::remove_line(&state.api, LineId(id))
        .await
        .map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_get_order(
    State(state): State<Arc<AppState>>,
    Path(number): Path<i64>,
) -> HttpResult<Json<OrderDetails>> {
    let order = server_api::get_order(&state.api, OrderNumber(number))
        .await
        .map_err(http_error)?;
    Ok(Json(order))
}

async fn http_ship_order(
    State(state): State<Arc<AppState>>,
    Path(number): Path<i64>,
) -> HttpResult<Json<OrderHeader>> {
    let order = server_api::ship_order(&state.api, OrderNumber(number))
        .await
        .map_err(http_error)?;
    Ok(Json(order))
}

async fn http_pending_orders(
    State(state): State<Arc<AppState>>,
    Path(dispensary_code): Path<String>,
) -> HttpResult<Json<Vec<OrderHeader>>> {
    let orders = server_api::pending_orders_for(&state.api, &DispensaryCode(dispensary_code))
        .await
        .map_err(http_error)?;
    Ok(Json(orders))
}

async fn http_units_ordered(
    State(state): State<Arc<AppState>>,
    Path(category): Path<i64>,
) -> HttpResult<Json<Vec<UnitsPerMedicine>>> {
    let stats = server_api::units_ordered_for_category(&state.api, CategoryCode(category))
        .await
        .map_err(http_error)?;
    Ok(Json(stats))
}

async fn http_units_ordered_rows(
    State(state): State<Arc<AppState>>,
    Path(category): Path<i64>,
) -> HttpResult<Json<Vec<(String, i64)>>> {
    let stats = server_api::units_ordered_for_category(&state.api, CategoryCode(category))
        .await
        .map_err(http_error)?;
    Ok(Json(
        stats.into_iter().map(|row| (row.name, row.units)).collect(),
    ))
}

async fn http_restock(State(state): State<Arc<AppState>>) -> HttpResult<String> {
    let report = server_api::restock(&state.api).await.map_err(http_error)?;
    Ok(report.to_text())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
