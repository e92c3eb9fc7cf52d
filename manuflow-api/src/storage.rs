//! Blob storage for uploaded files.
//!
//! Files are stored under a generated key `<uuid>-<sanitized name>` and
//! addressed by a public URL. The local implementation writes into
//! `upload_dir`, which the server exposes under `public_upload_url`.

use std::path::PathBuf;
use std::sync::Arc;

use rocket::fs::TempFile;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("empty upload")]
    Empty,
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Empty => ApiError::bad_request("The uploaded file is empty"),
            StorageError::Io(e) => ApiError::Internal(format!("storage failure: {}", e)),
        }
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
}

#[rocket::async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores an uploaded file; `original_name` is the client supplied name.
    async fn store(
        &self,
        file: &mut TempFile<'_>,
        original_name: Option<&str>,
    ) -> Result<StoredBlob, StorageError>;
}

/// Keeps only characters safe in a path segment and a URL. Directories
/// are stripped, never empty.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

pub struct LocalBlobStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> LocalBlobStore {
        LocalBlobStore {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> LocalBlobStore {
        LocalBlobStore::new(&config.upload_dir, config.upload_url_prefix())
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn key_for(name: &str) -> String {
        format!("{}-{}", Uuid::new_v4(), sanitize_file_name(name))
    }
}

#[rocket::async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        file: &mut TempFile<'_>,
        original_name: Option<&str>,
    ) -> Result<StoredBlob, StorageError> {
        if file.len() == 0 {
            return Err(StorageError::Empty);
        }
        let file_name = sanitize_file_name(original_name.or(file.name()).unwrap_or("file"));
        let key = LocalBlobStore::key_for(&file_name);
        rocket::tokio::fs::create_dir_all(&self.root).await?;
        file.copy_to(self.root.join(&key)).await?;
        info!("[storage] Stored {} ({} bytes)", key, file.len());
        Ok(StoredBlob {
            url: format!("{}/{}", self.url_prefix, key),
            key,
            file_name,
            content_type: file.content_type().map(|ct| ct.to_string()),
            size_bytes: file.len() as i64,
        })
    }
}

/// Managed state handing the configured store to request handlers.
#[derive(Clone)]
pub struct BlobStorage(pub Arc<dyn BlobStore>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("laudo final.pdf"), "laudo_final.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\foto.jpg"), "foto.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("relatório.pdf"), "relat_rio.pdf");
        assert_eq!(sanitize_file_name(&"a".repeat(300)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_keys_are_unique_and_keep_the_name() {
        let a = LocalBlobStore::key_for("meter.jpg");
        let b = LocalBlobStore::key_for("meter.jpg");
        assert_ne!(a, b);
        assert!(a.ends_with("-meter.jpg"));
    }
}
