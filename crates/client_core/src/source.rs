use async_trait::async_trait;
use serde_json::Value;
use shared::protocol::CATEGORIES_PATH;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Where the categories view gets its collection from.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, FetchError>;
}

/// Fetches `api/categories` relative to the page hosting the view.
pub struct HttpCollectionSource {
    http: reqwest::Client,
    url: Url,
    check_status: bool,
}

impl HttpCollectionSource {
    pub fn new(page_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self::with_url(page_url.join(CATEGORIES_PATH)?))
    }

    pub fn with_url(url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            check_status: false,
        }
    }

    /// Reject non-2xx responses before parsing. Off by default: an error
    /// page with a JSON body is accepted like any other payload.
    pub fn with_status_check(mut self, check_status: bool) -> Self {
        self.check_status = check_status;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl CollectionSource for HttpCollectionSource {
    async fn fetch(&self) -> Result<Value, FetchError> {
        let response = self.http.get(self.url.clone()).send().await?;
        let status = response.status();
        debug!(url = %self.url, %status, "categories response");
        if self.check_status && !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
