#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
#[cfg(feature = "storage-s3")]
use crate::S3BlobStore;
use crate::{BlobBackend, BlobStore, MemoryBlobStore, StorageError, StorageResult};
use scanvault_core::Config;
use std::sync::Arc;

/// Create a blob store based on configuration
pub async fn create_blob_store(config: &Config) -> StorageResult<Arc<dyn BlobStore>> {
    match config.blob_backend() {
        #[cfg(feature = "storage-s3")]
        BlobBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;

            let storage = S3BlobStore::new(
                bucket,
                config.s3_region().map(String::from),
                config.s3_endpoint().map(String::from),
                config.s3_allow_http(),
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        BlobBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        BlobBackend::Local => {
            let storage = LocalBlobStore::new(config.local_storage_path()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        BlobBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        BlobBackend::Memory => {
            tracing::warn!("Using in-memory blob store; blobs are lost on restart");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobs");
        let path_str = path.to_string_lossy().to_string();
        let config = Config::from_lookup(|key| match key {
            "SCANVAULT_VERSION" => Some("test".to_string()),
            "STORAGE_BACKEND" => Some("local".to_string()),
            "LOCAL_STORAGE_PATH" => Some(path_str.clone()),
            _ => None,
        })
        .unwrap();

        let store = create_blob_store(&config).await.unwrap();
        assert_eq!(store.backend_type(), BlobBackend::Local);
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_creates_memory_store() {
        let config = Config::from_lookup(|key| match key {
            "SCANVAULT_VERSION" => Some("test".to_string()),
            "STORAGE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();

        let store = create_blob_store(&config).await.unwrap();
        assert_eq!(store.backend_type(), BlobBackend::Memory);
        assert!(store.ping().await.is_ok());
    }
}
