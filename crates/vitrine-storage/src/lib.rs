//! Blob-store enumeration for Vitrine bundles.
//!
//! Defines the minimal [`StorageLister`] contract, two implementations (an
//! in-process bucket and the Firebase Storage REST API), and the recursive
//! file-map builder that turns a storage base path into a [`vitrine_core::FileMap`].

mod builder;
mod firebase;
mod lister;
mod memory;

pub use builder::{build_file_map, FileMapBuild};
pub use firebase::{
    encode_object_name, storage_path_from_download_url, FirebaseStorageConfig,
    FirebaseStorageLister, DEFAULT_FIREBASE_STORAGE_API_BASE,
};
pub use lister::{StorageError, StorageListing, StorageLister, StorageObject};
pub use memory::{MemoryRead, MemoryStorage};
