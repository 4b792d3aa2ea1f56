//! Storage trait definitions.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StorageResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl ObjectMetadata {
    /// Metadata with a content type guessed from the key's extension.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        let key = key.into();
        let content_type = mime_guess::from_path(&key)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            key,
            size,
            content_type,
            modified: None,
        }
    }

    pub fn with_modified(mut self, time: DateTime<Utc>) -> Self {
        self.modified = Some(time);
        self
    }
}

/// Key/value object store.
///
/// Every method validates its key with [`super::validate_key`] first.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Create or replace an object.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<ObjectMetadata>;

    /// Delete an object. Deleting a missing key is `NotFound`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// All objects, sorted by key.
    async fn list(&self) -> StorageResult<Vec<ObjectMetadata>>;
}
