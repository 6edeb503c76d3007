//! Recursive storage enumeration into a [`FileMap`].

use std::collections::BTreeSet;

use futures_util::future::join_all;
use vitrine_core::FileMap;

use crate::lister::StorageLister;

/// A freshly built file map plus what could not be enumerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMapBuild {
    pub base_path: String,
    pub map: FileMap,
    /// False when listing the base path itself failed.
    pub root_listed: bool,
    pub listed_prefixes: usize,
    pub incomplete_prefixes: Vec<String>,
    pub skipped_items: Vec<String>,
}

impl FileMapBuild {
    pub fn is_complete(&self) -> bool {
        self.root_listed && self.incomplete_prefixes.is_empty() && self.skipped_items.is_empty()
    }
}

/// Enumerates every object under `base_path` and resolves a fresh URL for each.
///
/// Never fails: inaccessible prefixes and items whose URL cannot be minted are
/// recorded on the returned [`FileMapBuild`] and skipped. Whether the resulting
/// map is good enough is the caller's decision.
#[tracing::instrument(
    name = "vitrine.storage.build_file_map",
    skip(lister),
    fields(base_path = %base_path)
)]
pub async fn build_file_map(lister: &dyn StorageLister, base_path: &str) -> FileMapBuild {
    let root = base_path.trim_matches('/').to_string();
    let mut pending = vec![root.clone()];
    let mut visited = BTreeSet::new();
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut build = FileMapBuild {
        base_path: root.clone(),
        root_listed: true,
        ..FileMapBuild::default()
    };

    while let Some(prefix) = pending.pop() {
        if !visited.insert(prefix.clone()) {
            continue;
        }
        let listing = match lister.list(&prefix).await {
            Ok(listing) => listing,
            Err(error) => {
                tracing::warn!(prefix = %prefix, %error, "storage prefix could not be listed");
                if prefix == root {
                    build.root_listed = false;
                }
                build.incomplete_prefixes.push(prefix);
                continue;
            }
        };
        build.listed_prefixes += 1;

        for sub_prefix in listing.sub_prefixes {
            let sub_prefix = sub_prefix.trim_matches('/').to_string();
            if sub_prefix.is_empty() || visited.contains(&sub_prefix) {
                continue;
            }
            if !is_within(&root, &sub_prefix) {
                tracing::warn!(prefix = %sub_prefix, "ignoring sub-prefix outside the base path");
                continue;
            }
            pending.push(sub_prefix);
        }

        let resolved = join_all(listing.items.iter().map(|item| async move {
            let url = lister.download_url(item).await;
            (item, url)
        }))
        .await;
        for (item, url) in resolved {
            match url {
                Ok(url) => {
                    let relative = relative_path(&root, &item.full_path);
                    if relative.is_empty() {
                        build.skipped_items.push(item.full_path.clone());
                    } else {
                        entries.push((relative.to_string(), url));
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        path = %item.full_path,
                        %error,
                        "download url could not be resolved"
                    );
                    build.skipped_items.push(item.full_path.clone());
                }
            }
        }
    }

    build.map = FileMap::from_entries(entries);
    tracing::debug!(
        files = build.map.len(),
        listed_prefixes = build.listed_prefixes,
        incomplete_prefixes = build.incomplete_prefixes.len(),
        skipped_items = build.skipped_items.len(),
        "built file map"
    );
    build
}

fn is_within(root: &str, path: &str) -> bool {
    root.is_empty()
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn relative_path<'a>(root: &str, full_path: &'a str) -> &'a str {
    let full_path = full_path.trim_start_matches('/');
    if root.is_empty() {
        return full_path;
    }
    full_path
        .strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(full_path)
}
