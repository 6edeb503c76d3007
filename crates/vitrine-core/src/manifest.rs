use serde::Deserialize;

use crate::path::normalize_path;

/// File name of the optional manifest co-located at the bundle root.
pub const DEFAULT_MANIFEST_FILE_NAME: &str = "manifest.json";

/// Optional `manifest.json` shipped with a bundle.
///
/// Only `entry` is read; any other fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BundleManifest {
    #[serde(default)]
    pub entry: Option<String>,
}

impl BundleManifest {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Normalized entry path, or `None` when missing or blank.
    pub fn entry_path(&self) -> Option<String> {
        let entry = self.entry.as_deref()?.trim();
        let normalized = normalize_path(entry);
        (!normalized.is_empty()).then_some(normalized)
    }
}
