//! Foundational bundle model shared across Vitrine crates.
//!
//! Provides path normalization, the bundle descriptor and file-map types, the
//! optional bundle manifest, and deterministic entry-point resolution.

pub mod descriptor;
pub mod entry;
pub mod file_map;
pub mod manifest;
pub mod path;

pub use descriptor::{BundleDescriptor, BundleFileSnapshot, BundleSource, DescriptorError};
pub use entry::{resolve_entry, EntryResolution, EntrySource};
pub use file_map::{FileMap, FileMapHit};
pub use manifest::{BundleManifest, DEFAULT_MANIFEST_FILE_NAME};
pub use path::{basename, is_html_path, join_storage_path, normalize_path, parent_dir};
