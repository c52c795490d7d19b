//! Blob store abstraction trait
//!
//! This module defines the BlobStore trait that all blob backends must implement.

use async_trait::async_trait;
use scanvault_core::{AppError, BlobBackend, ByteReader};
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The backend cannot be reached at all.
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Convert into an [`AppError`] carrying the failed operation as context.
    pub fn into_app_error(self, context: impl Into<String>) -> AppError {
        let context = context.into();
        match self {
            StorageError::NotFound(key) => AppError::NotFound(format!("{context}: blob {key}")),
            StorageError::Unavailable(msg) => {
                AppError::BackendUnavailable(format!("{context}: blob store: {msg}"))
            }
            other => AppError::Storage {
                message: context,
                source: anyhow::Error::new(other),
            },
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        err.into_app_error("blob store")
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reject keys that could escape a backend's namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.contains('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Blob store abstraction trait
///
/// Holds the raw bytes of uploaded documents until their analysis completes.
/// Every implementation must be safe to call from many tasks at once.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist exactly `size` bytes read from `data` under `id`.
    ///
    /// A reader that ends before `size` bytes is an error and nothing is kept.
    /// Saving an existing `id` overwrites it.
    async fn save(
        &self,
        id: &str,
        size: u64,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<()>;

    /// Open the blob stored under `id`. Missing blobs are `NotFound`.
    async fn get(&self, id: &str) -> StorageResult<ByteReader>;

    /// Remove the blob stored under `id`. Missing blobs are `NotFound`.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Cheap reachability check.
    async fn ping(&self) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> BlobBackend;
}
