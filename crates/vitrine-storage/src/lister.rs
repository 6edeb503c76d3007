use async_trait::async_trait;
use thiserror::Error;

/// One object returned by a storage listing, addressed by its full path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StorageObject {
    pub full_path: String,
}

impl StorageObject {
    pub fn new(full_path: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
        }
    }
}

/// Direct children of one prefix: objects and nested prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageListing {
    pub items: Vec<StorageObject>,
    pub sub_prefixes: Vec<String>,
}

/// Failure to list a prefix or mint a download URL.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("access denied for '{path}'")]
    AccessDenied { path: String },
    #[error("object not found: '{path}'")]
    NotFound { path: String },
    #[error("storage bucket is not configured")]
    MissingBucket,
    #[error("invalid storage response: {0}")]
    InvalidResponse(String),
}

/// Minimal storage contract the file-map builder depends on.
#[async_trait]
pub trait StorageLister: Send + Sync {
    /// Lists the direct children of `prefix` (no trailing slash).
    async fn list(&self, prefix: &str) -> Result<StorageListing, StorageError>;

    /// Mints a fresh, possibly time-limited, download URL for `item`.
    async fn download_url(&self, item: &StorageObject) -> Result<String, StorageError>;
}
