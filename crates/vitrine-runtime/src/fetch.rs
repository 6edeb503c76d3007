use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use thiserror::Error;
use vitrine_storage::{MemoryRead, MemoryStorage};

/// Failure to fetch a document; `Status` carries the non-success HTTP code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    Status(u16),
}

/// Fetches a document body as text from a previously minted download URL.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Settings for [`HttpDocumentFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 15_000,
        }
    }
}

/// [`DocumentFetcher`] over plain HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
}

impl HttpDocumentFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| FetchError::Network(format!("failed to build http client: {error}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::Network(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|error| FetchError::Network(error.to_string()))
    }
}

/// [`DocumentFetcher`] over URLs minted by [`MemoryStorage`]. Expired URLs
/// answer 403 and unknown ones 404, like a signed-URL blob store.
#[derive(Debug, Clone)]
pub struct MemoryDocumentFetcher {
    storage: Arc<MemoryStorage>,
}

impl MemoryDocumentFetcher {
    pub fn new(storage: Arc<MemoryStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl DocumentFetcher for MemoryDocumentFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        match self.storage.read_url(url) {
            MemoryRead::Found(body) => Ok(body),
            MemoryRead::Expired => Err(FetchError::Status(403)),
            MemoryRead::Missing => Err(FetchError::Status(404)),
        }
    }
}
