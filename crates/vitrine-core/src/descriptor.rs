use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::join_storage_path;

/// Snapshot of one uploaded file captured when the bundle was uploaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BundleFileSnapshot {
    pub file_name: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

/// Read-only description of an uploaded bundle, supplied by the widget data layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BundleDescriptor {
    pub id: String,
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub files: Vec<BundleFileSnapshot>,
}

/// Where the file list for a bundle comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    /// Enumerate the blob store under this base path.
    Storage { base_path: String },
    /// Only the upload-time `files[]` snapshot is available.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("bundle '{id}' has no storage path, upload id, or file list")]
    NoSourceOfTruth { id: String },
}

impl BundleDescriptor {
    pub fn storage_path(&self) -> Option<&str> {
        non_blank(self.storage_path.as_deref())
    }

    pub fn upload_id(&self) -> Option<&str> {
        non_blank(self.upload_id.as_deref())
    }

    pub fn explicit_entry(&self) -> Option<&str> {
        non_blank(self.entry.as_deref())
    }

    pub fn has_snapshot(&self) -> bool {
        self.files
            .iter()
            .any(|file| !file.file_name.trim().is_empty() && !file.download_url.trim().is_empty())
    }

    /// Picks the authoritative source: explicit storage path, then the
    /// conventional `<upload_prefix>/<upload_id>` path, then the snapshot.
    pub fn source(&self, upload_prefix: &str) -> Result<BundleSource, DescriptorError> {
        if let Some(path) = self.storage_path() {
            return Ok(BundleSource::Storage {
                base_path: path.trim_matches('/').to_string(),
            });
        }
        if let Some(upload_id) = self.upload_id() {
            return Ok(BundleSource::Storage {
                base_path: join_storage_path(upload_prefix, upload_id),
            });
        }
        if self.has_snapshot() {
            return Ok(BundleSource::Snapshot);
        }
        Err(DescriptorError::NoSourceOfTruth {
            id: self.id.clone(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_descriptor_deserializes_upload_time_shape() {
        let raw = r#"{
            "id": "w-1",
            "uploadId": "up-9",
            "files": [
                {"fileName": "index.html", "downloadURL": "https://x/i", "size": 12, "type": "text/html"}
            ]
        }"#;
        let descriptor: BundleDescriptor = serde_json::from_str(raw).expect("descriptor");
        assert_eq!(descriptor.upload_id(), Some("up-9"));
        assert_eq!(descriptor.files[0].download_url, "https://x/i");
        assert_eq!(descriptor.files[0].content_type.as_deref(), Some("text/html"));
        assert!(descriptor.storage_path.is_none());
    }

    #[test]
    fn unit_source_prefers_storage_path_then_upload_id_then_snapshot() {
        let mut descriptor = BundleDescriptor {
            id: "b".to_string(),
            storage_path: Some("/widgets/u1/b/".to_string()),
            upload_id: Some("up".to_string()),
            ..BundleDescriptor::default()
        };
        assert_eq!(
            descriptor.source("uploads"),
            Ok(BundleSource::Storage {
                base_path: "widgets/u1/b".to_string()
            })
        );

        descriptor.storage_path = Some("   ".to_string());
        assert_eq!(
            descriptor.source("uploads"),
            Ok(BundleSource::Storage {
                base_path: "uploads/up".to_string()
            })
        );

        descriptor.upload_id = None;
        descriptor.files.push(BundleFileSnapshot {
            file_name: "index.html".to_string(),
            download_url: "https://x/index".to_string(),
            ..BundleFileSnapshot::default()
        });
        assert_eq!(descriptor.source("uploads"), Ok(BundleSource::Snapshot));
    }

    #[test]
    fn regression_source_rejects_descriptor_without_any_source() {
        let descriptor = BundleDescriptor {
            id: "empty".to_string(),
            files: vec![BundleFileSnapshot::default()],
            ..BundleDescriptor::default()
        };
        assert_eq!(
            descriptor.source("uploads"),
            Err(DescriptorError::NoSourceOfTruth {
                id: "empty".to_string()
            })
        );
    }
}
