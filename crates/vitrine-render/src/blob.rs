//! Revocable object URLs for rendered documents.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub body: String,
}

impl Blob {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            content_type: HTML_CONTENT_TYPE.to_string(),
            body: body.into(),
        }
    }
}

/// Handle to a live blob: `blob:<origin>/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl {
    pub id: String,
    pub href: String,
}

#[derive(Debug, Default)]
struct BlobStoreInner {
    origin: String,
    blobs: Mutex<HashMap<String, Blob>>,
    counter: AtomicU64,
}

/// Shared registry of live blobs. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<BlobStoreInner>,
}

impl BlobStore {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(BlobStoreInner {
                origin: origin.into().trim_end_matches('/').to_string(),
                blobs: Mutex::new(HashMap::new()),
                counter: AtomicU64::new(1),
            }),
        }
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let count = self.inner.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("{millis:x}-{count:x}");
        let href = format!("blob:{}/{id}", self.inner.origin);
        self.blobs().insert(id.clone(), blob);
        ObjectUrl { id, href }
    }

    /// Releases a blob; returns false when it was already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        self.blobs().remove(&url.id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<Blob> {
        self.blobs().get(id).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.blobs().len()
    }
}
