//! Local filesystem storage implementation.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::{ObjectMetadata, Storage, StorageError, StorageResult, validate_key};

/// Objects stored as files directly under one directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    async fn ensure_base_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }
}

fn not_found_or_io(key: &str, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(err)
    }
}

fn system_time_to_chrono(time: SystemTime) -> Option<DateTime<Utc>> {
    let elapsed = time.duration_since(UNIX_EPOCH).ok()?;
    DateTime::from_timestamp(elapsed.as_secs() as i64, elapsed.subsec_nanos())
}

fn metadata_for(key: &str, meta: &std::fs::Metadata) -> ObjectMetadata {
    let object = ObjectMetadata::new(key, meta.len());
    match meta.modified().ok().and_then(system_time_to_chrono) {
        Some(modified) => object.with_modified(modified),
        None => object,
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        let path = self.object_path(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(metadata_for(key, &meta))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.object_path(key)?;
        let data = fs::read(&path).await.map_err(|e| not_found_or_io(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<ObjectMetadata> {
        let path = self.object_path(key)?;
        self.ensure_base_dir().await?;

        // Write beside the target and rename so readers never see a partial
        // object. Each write stages under its own name; the last rename wins.
        let staging = self
            .base_path
            .join(format!(".{}.partial", Uuid::new_v4().simple()));
        let staged = match fs::write(&staging, &data).await {
            Ok(()) => fs::rename(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        let meta = fs::metadata(&path).await?;
        Ok(metadata_for(key, &meta))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.object_path(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        debug!("Deleted {}", path.display());
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<ObjectMetadata>> {
        let mut read_dir = match fs::read_dir(&self.base_path).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(key) = entry.file_name().into_string() else {
                continue;
            };
            // Skips staging files and anything else that is not a valid key.
            if validate_key(&key).is_err() {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                objects.push(metadata_for(&key, &meta));
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
