//! Entry-point selection for a bundle.

use crate::descriptor::BundleDescriptor;
use crate::file_map::FileMap;
use crate::manifest::BundleManifest;
use crate::path::{basename, is_html_path, path_depth};

/// Which priority rule selected the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    Explicit,
    Manifest,
    Index,
    FirstHtml,
}

impl EntrySource {
    pub fn as_str(self) -> &'static str {
        match self {
            EntrySource::Explicit => "explicit",
            EntrySource::Manifest => "manifest",
            EntrySource::Index => "index",
            EntrySource::FirstHtml => "first_html",
        }
    }
}

/// The chosen entry file and its currently valid URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryResolution {
    pub entry: String,
    pub url: String,
    pub source: EntrySource,
}

/// Picks the bundle's HTML entry point.
///
/// Priority, first match wins:
/// 1. the descriptor's explicit `entry`, when present in the map;
/// 2. the manifest's `entry`, when present in the map;
/// 3. `index.html` / `index.htm` at any depth, shallowest first;
/// 4. any other `.html` / `.htm`, shallowest first, lexical tiebreak.
///
/// When `file_map` is empty and the descriptor carries a `files[]` snapshot,
/// the snapshot URLs are used directly.
pub fn resolve_entry(
    descriptor: &BundleDescriptor,
    file_map: &FileMap,
    manifest: Option<&BundleManifest>,
) -> Option<EntryResolution> {
    let snapshot;
    let map = if file_map.is_empty() && descriptor.has_snapshot() {
        snapshot = FileMap::from_snapshot(&descriptor.files);
        &snapshot
    } else {
        file_map
    };

    if let Some(explicit) = descriptor.explicit_entry() {
        if let Some(hit) = map.lookup(explicit) {
            return Some(resolution(hit.path, hit.url, EntrySource::Explicit));
        }
    }

    if let Some(declared) = manifest.and_then(BundleManifest::entry_path) {
        if let Some(hit) = map.lookup(&declared) {
            return Some(resolution(hit.path, hit.url, EntrySource::Manifest));
        }
    }

    let mut index_pages = Vec::new();
    let mut other_pages = Vec::new();
    for (path, url) in map.iter() {
        if !is_html_path(path) {
            continue;
        }
        let name = basename(path).to_ascii_lowercase();
        if name == "index.html" || name == "index.htm" {
            index_pages.push((path, url));
        } else {
            other_pages.push((path, url));
        }
    }

    if let Some((path, url)) = shallowest(index_pages) {
        return Some(resolution(path, url, EntrySource::Index));
    }
    shallowest(other_pages).map(|(path, url)| resolution(path, url, EntrySource::FirstHtml))
}

fn shallowest<'a>(mut candidates: Vec<(&'a str, &'a str)>) -> Option<(&'a str, &'a str)> {
    candidates.sort_by(|(left, _), (right, _)| {
        path_depth(left)
            .cmp(&path_depth(right))
            .then_with(|| left.cmp(right))
    });
    candidates.into_iter().next()
}

fn resolution(path: &str, url: &str, source: EntrySource) -> EntryResolution {
    EntryResolution {
        entry: path.to_string(),
        url: url.to_string(),
        source,
    }
}
