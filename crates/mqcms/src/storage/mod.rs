//! Flat object storage for uploaded media and JSON documents.
//!
//! Objects are addressed by a single-segment key such as
//! `1718000000000-banner.png`; keys never contain path separators.

mod error;
mod key;
mod local;
mod traits;

pub use error::{StorageError, StorageResult};
pub use key::{MEDIA_EXTENSIONS, is_media_key, media_key, sanitize_filename, validate_key};
pub use local::LocalStorage;
pub use traits::{ObjectMetadata, Storage};

use std::path::PathBuf;
use std::sync::Arc;

/// Create a storage backend rooted at `path`.
pub fn create_storage(path: impl Into<PathBuf>) -> Arc<dyn Storage> {
    Arc::new(LocalStorage::new(path))
}
