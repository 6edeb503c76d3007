use std::collections::BTreeMap;

use crate::descriptor::BundleFileSnapshot;
use crate::path::{basename, normalize_path, path_depth};

/// Result of a [`FileMap::lookup`]: the full path that matched and its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMapHit<'a> {
    pub path: &'a str,
    pub url: &'a str,
}

/// Immutable mapping from normalized relative path to the current download URL.
///
/// Every path is also reachable through its basename. When two paths share a
/// basename, the shallowest wins and lexical order breaks ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMap {
    paths: BTreeMap<String, String>,
    basenames: BTreeMap<String, String>,
}

impl FileMap {
    /// Builds a map from `(relative path, url)` pairs. Paths are normalized.
    /// Empty paths, directory-like paths ending in `/`, and empty URLs are
    /// dropped. The first URL seen for a path wins.
    pub fn from_entries<I, P, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: AsRef<str>,
        U: Into<String>,
    {
        let mut paths = BTreeMap::new();
        for (raw_path, url) in entries {
            let path = normalize_path(raw_path.as_ref());
            let url = url.into();
            if basename(&path).is_empty() || url.trim().is_empty() {
                continue;
            }
            paths.entry(path).or_insert(url);
        }
        Self::index(paths)
    }

    /// Builds a map straight from an upload-time `files[]` snapshot.
    pub fn from_snapshot(files: &[BundleFileSnapshot]) -> Self {
        Self::from_entries(
            files
                .iter()
                .map(|file| (file.file_name.as_str(), file.download_url.clone())),
        )
    }

    fn index(paths: BTreeMap<String, String>) -> Self {
        let mut ordered: Vec<&String> = paths.keys().collect();
        ordered.sort_by(|left, right| {
            path_depth(left)
                .cmp(&path_depth(right))
                .then_with(|| left.cmp(right))
        });
        let mut basenames = BTreeMap::new();
        for path in ordered {
            let name = basename(path);
            if name.is_empty() {
                continue;
            }
            basenames
                .entry(name.to_string())
                .or_insert_with(|| path.clone());
        }
        Self { paths, basenames }
    }

    /// Resolves a reference by full normalized path first, then by basename.
    pub fn lookup(&self, reference: &str) -> Option<FileMapHit<'_>> {
        let normalized = normalize_path(reference);
        if normalized.is_empty() {
            return None;
        }
        if let Some((path, url)) = self.paths.get_key_value(normalized.as_str()) {
            return Some(FileMapHit {
                path: path.as_str(),
                url: url.as_str(),
            });
        }
        let name = basename(&normalized);
        if name.is_empty() {
            return None;
        }
        let full_path = self.basenames.get(name)?;
        let (path, url) = self.paths.get_key_value(full_path.as_str())?;
        Some(FileMapHit {
            path: path.as_str(),
            url: url.as_str(),
        })
    }

    /// Exact full-path match; no basename fallback.
    pub fn get_exact(&self, path: &str) -> Option<&str> {
        self.paths.get(normalize_path(path).as_str()).map(String::as_str)
    }

    pub fn url_for(&self, reference: &str) -> Option<&str> {
        self.lookup(reference).map(|hit| hit.url)
    }

    /// Full paths in lexical order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths
            .iter()
            .map(|(path, url)| (path.as_str(), url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
