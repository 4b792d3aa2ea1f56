//! JSON documents kept in the documents store.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::storage::{Storage, StorageError, StorageResult};

/// Read `key` as JSON. A missing document is `T::default()`.
pub(super) async fn load<T>(storage: &dyn Storage, key: &str) -> StorageResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = match storage.get(key).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return Ok(T::default()),
        Err(e) => return Err(e),
    };
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub(super) async fn save<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let encoded = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    storage.put(key, Bytes::from(encoded)).await?;
    Ok(())
}
