use anyhow::Result;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Category, CategoryCode, Dispensary, LineId, Medicine, MedicineRef, OrderNumber},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{AddLineQuery, LineDetails, OrderDetails, OrderHeader},
};

pub mod error;
pub mod host;
pub mod notify;
pub mod source;
pub mod view;

pub use error::{FetchError, HostError};
pub use host::{render_value, ViewComponent, ViewHost, EMPTY_PLACEHOLDER};
pub use notify::{Notifier, StderrNotifier};
pub use source::{CollectionSource, HttpCollectionSource};
pub use view::{CategoriesView, DO_AJAX};

/// Typed client for the pharmacy REST API.
pub struct PharmacyClient {
    http: Client,
    server_url: String,
}

impl PharmacyClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<()> {
        self.http
            .get(format!("{}/healthz", self.server_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get_json("/api/categories").await
    }

    pub async fn category(&self, code: CategoryCode) -> Result<Category> {
        self.get_json(&format!("/api/categories/{}", code.0)).await
    }

    pub async fn available_medicines(&self) -> Result<Vec<Medicine>> {
        self.get_json("/api/medicines/available").await
    }

    pub async fn dispensaries(&self) -> Result<Vec<Dispensary>> {
        self.get_json("/api/dispensaries").await
    }

    pub async fn create_order(&self, dispensary_code: &str) -> Result<OrderDetails> {
        let res = self
            .http
            .post(format!("{}/api/orders/for/{dispensary_code}", self.server_url))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn add_line(
        &self,
        order: OrderNumber,
        medicine: MedicineRef,
        quantity: i64,
    ) -> Result<LineDetails> {
        let res = self
            .http
            .post(format!("{}/api/orders/lines", self.server_url))
            .query(&AddLineQuery {
                order: order.0,
                medicine: medicine.0,
                quantity,
            })
            .send()
            .await?;
        decode(res).await
    }

    pub async fn remove_line(&self, id: LineId) -> Result<()> {
        let res = self
            .http
            .delete(format!("{}/api/orders/lines/{}", self.server_url, id.0))
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    pub async fn ship_order(&self, number: OrderNumber) -> Result<OrderHeader> {
        let res = self
            .http
            .post(format!("{}/api/orders/{}/ship", self.server_url, number.0))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn order(&self, number: OrderNumber) -> Result<OrderDetails> {
        self.get_json(&format!("/api/orders/{}", number.0)).await
    }

    pub async fn pending_orders(&self, dispensary_code: &str) -> Result<Vec<OrderHeader>> {
        self.get_json(&format!("/api/orders/pending/{dispensary_code}"))
            .await
    }

    pub async fn restock(&self) -> Result<String> {
        let res = self
            .http
            .post(format!("{}/api/restock", self.server_url))
            .send()
            .await?;
        Ok(ensure_success(res).await?.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let res = self
            .http
            .get(format!("{}{path}", self.server_url))
            .send()
            .await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T> {
    Ok(ensure_success(res).await?.json().await?)
}

/// Turns an error response into an `ApiException`, keeping the server's code when it sent one.
async fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        ApiError::new(ErrorCode::Internal, format!("HTTP {status}: {body}"))
    });
    Err(ApiException::from(error).into())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
