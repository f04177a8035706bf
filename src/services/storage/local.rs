//! Local disk storage
//!
//! Objects are plain files under the upload directory; the key is the path
//! relative to it. The site serves them at the configured local URL prefix.

use super::{validate_key, ObjectStore, StorageError};
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create upload directory {}", parent.display()))?;
        }

        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to save file {}", path.display()))?;

        tracing::debug!("Stored {} ({} bytes) on disk", key, bytes.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to delete file {}", path.display()))
                .into()),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
