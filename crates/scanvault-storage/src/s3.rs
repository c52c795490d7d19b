use crate::traits::{validate_key, BlobStore, StorageError, StorageResult};
use crate::BlobBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use scanvault_core::ByteReader;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Key probed by [`BlobStore::ping`]; it does not need to exist.
const PING_KEY: &str = ".scanvault-ping";

/// S3 blob store
#[derive(Clone, Debug)]
pub struct S3BlobStore {
    store: AmazonS3,
    bucket: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `allow_http` - Permit plain HTTP endpoints
    pub fn new(
        bucket: String,
        region: Option<String>,
        endpoint_url: Option<String>,
        allow_http: bool,
    ) -> StorageResult<Self> {
        // Credentials come from the standard AWS_* environment variables.
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket.clone());

        if let Some(region) = region {
            builder = builder.with_region(region);
        }

        if let Some(ref endpoint) = endpoint_url {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http || endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3BlobStore { store, bucket })
    }

    fn location(id: &str) -> StorageResult<Path> {
        validate_key(id)?;
        Ok(Path::from(id.to_string()))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn save(
        &self,
        id: &str,
        size: u64,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<()> {
        let location = Self::location(id)?;
        let start = std::time::Instant::now();

        // Uploads are bounded by the HTTP body limit, so a single put is enough.
        let mut buffer = Vec::with_capacity(size.min(8 * 1024 * 1024) as usize);
        let read = data.take(size).read_to_end(&mut buffer).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
        })?;
        if (read as u64) < size {
            return Err(StorageError::UploadFailed(format!(
                "Short read for {}: expected {} bytes, got {}",
                id, size, read
            )));
        }

        let result: ObjectResult<_> = self
            .store
            .put(&location, PutPayload::from(Bytes::from(buffer)))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %id,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 save failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 save successful"
        );

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<ByteReader> {
        let location = Self::location(id)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(id.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %id,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %id,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(Box::pin(Cursor::new(bytes)))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let location = Self::location(id)?;
        let start = std::time::Instant::now();

        // S3 deletes are idempotent; check existence to report missing blobs.
        match self.store.head(&location).await {
            Ok(_) => {}
            Err(ObjectStoreError::NotFound { .. }) => {
                return Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        }

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %id,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        let location = Path::from(PING_KEY);
        match self.store.head(&location).await {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    fn backend_type(&self) -> BlobBackend {
        BlobBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_against_custom_endpoint() {
        let store = S3BlobStore::new(
            "scanvault".to_string(),
            Some("us-east-1".to_string()),
            Some("http://localhost:9000".to_string()),
            false,
        )
        .unwrap();
        assert_eq!(store.backend_type(), BlobBackend::S3);
    }

    #[test]
    fn test_location_rejects_traversal() {
        assert!(S3BlobStore::location("../other-bucket").is_err());
        assert!(S3BlobStore::location("kAFQmDzST7DWlj99KOF_cg").is_ok());
    }
}
