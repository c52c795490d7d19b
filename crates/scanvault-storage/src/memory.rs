use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use scanvault_core::{BlobBackend, ByteReader};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::traits::{validate_key, BlobStore, StorageError, StorageResult};

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Can be switched offline, in which case every call fails with
/// [`StorageError::Unavailable`].
#[derive(Debug)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Bytes>,
    online: AtomicBool,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self {
            blobs: DashMap::new(),
            online: AtomicBool::new(true),
        }
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blobs.contains_key(id)
    }

    /// Stored bytes for `id`, bypassing the online switch.
    pub fn snapshot(&self, id: &str) -> Option<Bytes> {
        self.blobs.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StorageError::Unavailable(
                "memory blob store is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(
        &self,
        id: &str,
        size: u64,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<()> {
        self.ensure_online()?;
        validate_key(id)?;

        let mut buffer = Vec::with_capacity(size.min(64 * 1024) as usize);
        let read = data.take(size).read_to_end(&mut buffer).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload for {}: {}", id, e))
        })?;
        if (read as u64) < size {
            return Err(StorageError::UploadFailed(format!(
                "Short read for {}: expected {} bytes, got {}",
                id, size, read
            )));
        }

        self.blobs.insert(id.to_string(), Bytes::from(buffer));
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<ByteReader> {
        self.ensure_online()?;
        let data = self
            .blobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.ensure_online()?;
        self.blobs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn ping(&self) -> StorageResult<()> {
        self.ensure_online()
    }

    fn backend_type(&self) -> BlobBackend {
        BlobBackend::Memory
    }
}
