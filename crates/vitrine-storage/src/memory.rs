//! In-process bucket used by hosts without a remote blob store and by tests.
//!
//! Every `download_url` call mints a new versioned URL, mirroring signed URLs
//! that differ per request. [`MemoryStorage::expire_issued_urls`] invalidates
//! everything minted so far, which is how callers simulate URL expiry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use vitrine_core::parent_dir;

use crate::lister::{StorageError, StorageListing, StorageLister, StorageObject};

/// Outcome of reading back a URL minted by [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryRead {
    Found(String),
    Expired,
    Missing,
}

#[derive(Debug, Default)]
struct MemoryStorageState {
    objects: BTreeMap<String, String>,
    denied_prefixes: BTreeSet<String>,
    next_version: u64,
    valid_from_version: u64,
    list_calls: u64,
}

/// In-memory [`StorageLister`] whose download URLs look like
/// `{base_url}/{path}?v={version}`.
#[derive(Debug)]
pub struct MemoryStorage {
    base_url: String,
    state: Mutex<MemoryStorageState>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(MemoryStorageState {
                next_version: 1,
                valid_from_version: 1,
                ..MemoryStorageState::default()
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryStorageState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::InvalidResponse("memory storage lock is poisoned".into()))
    }

    pub fn put(&self, full_path: &str, contents: &str) {
        if let Ok(mut state) = self.state() {
            state.objects.insert(
                full_path.trim_matches('/').to_string(),
                contents.to_string(),
            );
        }
    }

    pub fn remove(&self, full_path: &str) {
        if let Ok(mut state) = self.state() {
            state.objects.remove(full_path.trim_matches('/'));
        }
    }

    /// Makes `list(prefix)` fail with [`StorageError::AccessDenied`].
    pub fn deny_prefix(&self, prefix: &str) {
        if let Ok(mut state) = self.state() {
            state
                .denied_prefixes
                .insert(prefix.trim_matches('/').to_string());
        }
    }

    pub fn allow_prefix(&self, prefix: &str) {
        if let Ok(mut state) = self.state() {
            state.denied_prefixes.remove(prefix.trim_matches('/'));
        }
    }

    /// Invalidates every URL minted so far.
    pub fn expire_issued_urls(&self) {
        if let Ok(mut state) = self.state() {
            state.valid_from_version = state.next_version;
        }
    }

    pub fn list_calls(&self) -> u64 {
        self.state().map(|state| state.list_calls).unwrap_or(0)
    }

    /// Resolves a URL previously returned by `download_url`.
    pub fn read_url(&self, url: &str) -> MemoryRead {
        let Some(rest) = url
            .strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return MemoryRead::Missing;
        };
        let Some((path, version)) = rest.rsplit_once("?v=") else {
            return MemoryRead::Missing;
        };
        let Ok(version) = version.parse::<u64>() else {
            return MemoryRead::Missing;
        };
        let Ok(state) = self.state() else {
            return MemoryRead::Missing;
        };
        if version >= state.next_version {
            return MemoryRead::Missing;
        }
        if version < state.valid_from_version {
            return MemoryRead::Expired;
        }
        match state.objects.get(path) {
            Some(contents) => MemoryRead::Found(contents.clone()),
            None => MemoryRead::Missing,
        }
    }
}

#[async_trait]
impl StorageLister for MemoryStorage {
    async fn list(&self, prefix: &str) -> Result<StorageListing, StorageError> {
        let prefix = prefix.trim_matches('/');
        let mut state = self.state()?;
        state.list_calls += 1;
        if state.denied_prefixes.contains(prefix) {
            return Err(StorageError::AccessDenied {
                path: prefix.to_string(),
            });
        }

        let mut listing = StorageListing::default();
        let mut sub_prefixes = BTreeSet::new();
        for path in state.objects.keys() {
            let parent = parent_dir(path);
            if parent == prefix {
                listing.items.push(StorageObject::new(path.clone()));
                continue;
            }
            let rest = if prefix.is_empty() {
                Some(path.as_str())
            } else {
                path.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('/'))
            };
            if let Some((child, _)) = rest.and_then(|rest| rest.split_once('/')) {
                sub_prefixes.insert(vitrine_core::join_storage_path(prefix, child));
            }
        }
        listing.sub_prefixes = sub_prefixes.into_iter().collect();
        Ok(listing)
    }

    async fn download_url(&self, item: &StorageObject) -> Result<String, StorageError> {
        let path = item.full_path.trim_matches('/');
        let mut state = self.state()?;
        if !state.objects.contains_key(path) {
            return Err(StorageError::NotFound {
                path: path.to_string(),
            });
        }
        let version = state.next_version;
        state.next_version += 1;
        Ok(format!("{}/{}?v={}", self.base_url, path, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unit_list_splits_items_and_sub_prefixes() {
        let storage = MemoryStorage::new("https://m.test/");
        storage.put("b/index.html", "i");
        storage.put("b/css/a.css", "a");
        storage.put("b/css/deep/b.css", "b");
        storage.put("top.txt", "t");

        let listing = storage.list("b").await.expect("list b");
        assert_eq!(listing.items, vec![StorageObject::new("b/index.html")]);
        assert_eq!(listing.sub_prefixes, vec!["b/css".to_string()]);

        let root = storage.list("").await.expect("list root");
        assert_eq!(root.items, vec![StorageObject::new("top.txt")]);
        assert_eq!(root.sub_prefixes, vec!["b".to_string()]);
        assert_eq!(storage.list_calls(), 2);
    }

    #[tokio::test]
    async fn functional_expired_urls_stop_resolving() {
        let storage = MemoryStorage::new("https://m.test");
        storage.put("b/index.html", "<p>hi</p>");
        let url = storage
            .download_url(&StorageObject::new("b/index.html"))
            .await
            .expect("url");
        assert_eq!(url, "https://m.test/b/index.html?v=1");
        assert_eq!(storage.read_url(&url), MemoryRead::Found("<p>hi</p>".into()));

        storage.expire_issued_urls();
        assert_eq!(storage.read_url(&url), MemoryRead::Expired);

        let fresh = storage
            .download_url(&StorageObject::new("b/index.html"))
            .await
            .expect("fresh url");
        assert_eq!(storage.read_url(&fresh), MemoryRead::Found("<p>hi</p>".into()));
        assert_eq!(storage.read_url("https://other/b/index.html?v=2"), MemoryRead::Missing);
    }

    #[tokio::test]
    async fn regression_denied_prefix_and_missing_object_report_errors() {
        let storage = MemoryStorage::new("https://m.test");
        storage.deny_prefix("/secret/");
        assert!(matches!(
            storage.list("secret").await,
            Err(StorageError::AccessDenied { .. })
        ));
        storage.allow_prefix("secret");
        assert!(storage.list("secret").await.is_ok());
        assert!(matches!(
            storage.download_url(&StorageObject::new("nope.js")).await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
