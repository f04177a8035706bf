//! Image upload service
//!
//! Validates an upload against the configured limits, names it
//! `{key_prefix}/{yyyy}/{mm}/{uuid}.{ext}` and hands it to the object store.

use crate::config::UploadConfig;
use crate::services::storage::{validate_key, ObjectStore, StorageError, StorageUrls};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub key: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}")]
    InvalidType(String),

    #[error("File too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("File is empty")]
    Empty,

    #[error("Not an uploaded image: {0}")]
    UnknownImage(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// MIME type guessed from a file name, for clients that send none
fn mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

/// Lowercased MIME type without parameters
fn effective_content_type(filename: &str, content_type: &str) -> String {
    let base = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if base.is_empty() || base == "application/octet-stream" {
        if let Some(guessed) = mime_from_filename(filename) {
            return guessed.to_string();
        }
    }
    base
}

pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    urls: StorageUrls,
    config: UploadConfig,
    key_prefix: String,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        urls: StorageUrls,
        config: UploadConfig,
        key_prefix: &str,
    ) -> Self {
        Self {
            store,
            urls,
            config,
            key_prefix: key_prefix.trim_matches('/').to_string(),
        }
    }

    pub fn urls(&self) -> &StorageUrls {
        &self.urls
    }

    /// Backend label, `local` or `r2`
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    fn new_key(&self, extension: &str) -> String {
        let now = Utc::now();
        let name = format!(
            "{:04}/{:02}/{}.{}",
            now.year(),
            now.month(),
            Uuid::new_v4().simple(),
            extension
        );
        if self.key_prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.key_prefix, name)
        }
    }

    pub async fn upload_image(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, UploadError> {
        let content_type = effective_content_type(filename, content_type);
        if !self.config.is_type_allowed(&content_type) {
            return Err(UploadError::InvalidType(content_type));
        }

        let size = bytes.len() as u64;
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        let key = self.new_key(self.config.extension_for(&content_type));
        self.store.put(&key, bytes, &content_type).await?;

        tracing::info!("Uploaded {} as {} ({} bytes)", filename, key, size);
        Ok(UploadedImage {
            url: self.urls.public_url(&key),
            key,
            size,
            content_type,
        })
    }

    /// Delete by public URL (any recognized shape) or bare key. Returns the key.
    pub async fn delete_image(&self, url_or_key: &str) -> Result<String, UploadError> {
        let input = url_or_key.trim();
        // No scheme and no leading `/` means a bare key, never a URL
        let is_bare_key = !input.contains("://") && !input.starts_with('/');
        let key = if is_bare_key {
            validate_key(input).map_err(|_| UploadError::UnknownImage(input.to_string()))?;
            input.to_string()
        } else {
            self.urls
                .key_from_url(input)
                .ok_or_else(|| UploadError::UnknownImage(input.to_string()))?
        };

        self.store.delete(&key).await?;
        tracing::info!("Deleted upload {}", key);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::services::storage::LocalStore;
    use tempfile::TempDir;

    fn service(max_file_size: u64) -> (TempDir, UploadService) {
        let dir = TempDir::new().unwrap();
        let config = UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size,
            ..Default::default()
        };
        let storage = StorageConfig::default();
        let service = UploadService::new(
            Arc::new(LocalStore::new(dir.path().to_path_buf())),
            StorageUrls::from_config(&storage),
            config,
            &storage.key_prefix,
        );
        (dir, service)
    }

    #[test]
    fn test_effective_content_type() {
        assert_eq!(effective_content_type("a.png", "Image/PNG; charset=binary"), "image/png");
        assert_eq!(effective_content_type("photo.JPEG", "application/octet-stream"), "image/jpeg");
        assert_eq!(effective_content_type("photo.webp", ""), "image/webp");
        assert_eq!(effective_content_type("doc.pdf", ""), "");
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let (dir, service) = service(1024);
        let uploaded = service
            .upload_image("cat.png", "image/png", b"not really a png".to_vec())
            .await
            .unwrap();

        assert!(uploaded.key.starts_with("images/"));
        assert!(uploaded.key.ends_with(".png"));
        assert_eq!(uploaded.key.split('/').count(), 4);
        assert_eq!(uploaded.url, format!("/uploads/{}", uploaded.key));
        assert_eq!(uploaded.size, 16);
        assert!(dir.path().join(&uploaded.key).exists());

        let key = service.delete_image(&uploaded.url).await.unwrap();
        assert_eq!(key, uploaded.key);
        assert!(!dir.path().join(&uploaded.key).exists());
    }

    #[tokio::test]
    async fn test_delete_by_bare_key() {
        let (_dir, service) = service(1024);
        let uploaded = service
            .upload_image("a.gif", "image/gif", vec![1])
            .await
            .unwrap();
        assert_eq!(service.delete_image(&uploaded.key).await.unwrap(), uploaded.key);
    }

    #[tokio::test]
    async fn test_delete_by_key_when_prefix_matches_url_prefix() {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            key_prefix: "uploads".to_string(),
            ..Default::default()
        };
        let service = UploadService::new(
            Arc::new(LocalStore::new(dir.path().to_path_buf())),
            StorageUrls::from_config(&storage),
            UploadConfig {
                path: dir.path().to_path_buf(),
                ..Default::default()
            },
            &storage.key_prefix,
        );

        let by_key = service.upload_image("a.png", "image/png", vec![1]).await.unwrap();
        assert!(by_key.key.starts_with("uploads/"));
        assert_eq!(service.delete_image(&by_key.key).await.unwrap(), by_key.key);
        assert!(!dir.path().join(&by_key.key).exists());

        let by_url = service.upload_image("b.png", "image/png", vec![1]).await.unwrap();
        assert_eq!(by_url.url, format!("/uploads/{}", by_url.key));
        assert_eq!(service.delete_image(&by_url.url).await.unwrap(), by_url.key);
        assert!(!dir.path().join(&by_url.key).exists());
    }

    #[tokio::test]
    async fn test_rejects_wrong_type_and_size() {
        let (_dir, service) = service(4);

        assert!(matches!(
            service.upload_image("a.pdf", "application/pdf", vec![1]).await,
            Err(UploadError::InvalidType(t)) if t == "application/pdf"
        ));
        assert!(matches!(
            service.upload_image("a.png", "image/png", vec![0; 5]).await,
            Err(UploadError::TooLarge { size: 5, max: 4 })
        ));
        assert!(matches!(
            service.upload_image("a.png", "image/png", vec![]).await,
            Err(UploadError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_delete_foreign_url_rejected() {
        let (_dir, service) = service(1024);
        assert!(matches!(
            service.delete_image("https://elsewhere.com/a.png").await,
            Err(UploadError::UnknownImage(_))
        ));
        assert!(matches!(
            service.delete_image("../../etc/passwd").await,
            Err(UploadError::UnknownImage(_))
        ));
    }
}
