//! Object storage for uploaded images
//!
//! Two backends share the `ObjectStore` trait:
//! - `R2Store`: Cloudflare R2 through its S3-compatible API
//! - `LocalStore`: files on disk, served by the site under `/uploads`
//!
//! `StorageUrls` maps between object keys and the public URLs they are
//! reachable at.

pub mod local;
pub mod r2;
pub mod url;

pub use local::LocalStore;
pub use r2::R2Store;
pub use url::StorageUrls;

use crate::config::{StorageConfig, StorageDriver, UploadConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Storage error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Remove `key`. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Relative, slash-separated, no `.`/`..` or empty segments
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.len() > 1024
        || key.contains('\\')
        || key.chars().any(|c| c.is_control())
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Build the backend the configuration selects
pub fn create_store(
    storage: &StorageConfig,
    upload: &UploadConfig,
) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match storage.driver {
        StorageDriver::Local => Arc::new(LocalStore::new(upload.path.clone())),
        StorageDriver::R2 => Arc::new(R2Store::new(storage)?),
    };
    tracing::info!("Using {} object storage", store.name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("images/2024/05/a.png").is_ok());
        assert!(validate_key("a").is_ok());
        assert!(validate_key("..hidden/ok").is_ok());

        for bad in ["", "/abs", "trailing/", "a//b", "a/../b", "./a", "..", "a\\b", "a\nb"] {
            assert!(validate_key(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_create_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let upload = UploadConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = create_store(&StorageConfig::default(), &upload).unwrap();
        assert_eq!(store.name(), "local");
    }

    #[test]
    fn test_create_r2_store() {
        let storage = StorageConfig {
            driver: StorageDriver::R2,
            account_id: "abc123".to_string(),
            bucket: "media".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            ..Default::default()
        };
        let store = create_store(&storage, &UploadConfig::default()).unwrap();
        assert_eq!(store.name(), "r2");
    }
}
