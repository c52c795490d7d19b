use crate::traits::{validate_key, BlobStore, StorageError, StorageResult};
use crate::BlobBackend;
use async_trait::async_trait;
use scanvault_core::ByteReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Suffix source for temporary files; concurrent writes of one key must not
/// share a temporary path.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem blob store
///
/// Each blob is one file named after its identifier, directly under the root
/// directory. Writes go to a temporary sibling first and are renamed into
/// place once synced, so readers never observe a partial blob.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore rooted at `base_path` (e.g. "/var/lib/scanvault/blobs")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a blob key to a filesystem path with security validation
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;

        let path = self.base_path.join(key);
        if path.parent() != Some(self.base_path.as_path()) {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// `<path>.<pid>-<n>.partial`, unique per write within this root.
    fn temp_path(path: &Path) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{}-{}.partial", std::process::id(), n));
        PathBuf::from(name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(
        &self,
        id: &str,
        size: u64,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<()> {
        let path = self.key_to_path(id)?;
        let temp = Self::temp_path(&path);
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&temp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", temp.display(), e))
        })?;

        let mut limited = data.take(size);
        let copied = match tokio::io::copy(&mut limited, &mut file).await {
            Ok(copied) => copied,
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    temp.display(),
                    e
                )));
            }
        };

        if copied < size {
            drop(file);
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::UploadFailed(format!(
                "Short read for {}: expected {} bytes, got {}",
                id, size, copied
            )));
        }

        let synced = match file.flush().await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };
        drop(file);
        if let Err(e) = synced {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                temp.display(),
                e
            )));
        }

        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            key = %id,
            size_bytes = copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<ByteReader> {
        let path = self.key_to_path(id)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(path = %path.display(), key = %id, "Local storage blob opened");

        Ok(Box::pin(file))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.key_to_path(id)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.base_path).await.map_err(|e| {
            StorageError::Unavailable(format!(
                "Storage directory {} is not accessible: {}",
                self.base_path.display(),
                e
            ))
        })?;
        if !meta.is_dir() {
            return Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.base_path.display()
            )));
        }
        Ok(())
    }

    fn backend_type(&self) -> BlobBackend {
        BlobBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn read_all(mut reader: ByteReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_local_storage_save_get() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let mut data: &[u8] = b"test data and more";
        storage.save("blob-1", 9, &mut data).await.unwrap();

        let stored = read_all(storage.get("blob-1").await.unwrap()).await;
        assert_eq!(stored, b"test data");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_saves_of_same_key() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();
        let payload: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
        let size = payload.len() as u64;

        let first = {
            let storage = storage.clone();
            let payload = payload.clone();
            tokio::spawn(async move { storage.save("blob-1", size, &mut payload.as_slice()).await })
        };
        let second = {
            let storage = storage.clone();
            let payload = payload.clone();
            tokio::spawn(async move { storage.save("blob-1", size, &mut payload.as_slice()).await })
        };
        let (first, second) = tokio::join!(first, second);
        first.unwrap().unwrap();
        second.unwrap().unwrap();

        let stored = read_all(storage.get("blob-1").await.unwrap()).await;
        assert_eq!(stored, payload);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("blob-1")]);
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let path = Path::new("/blobs/blob-1");
        let a = LocalBlobStore::temp_path(path);
        let b = LocalBlobStore::temp_path(path);
        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        assert!(a.to_string_lossy().ends_with(".partial"));
    }

    #[tokio::test]
    async fn test_short_stream_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let mut data: &[u8] = b"short";
        let result = storage.save("blob-1", 100, &mut data).await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(matches!(
            storage.get("blob-1").await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let mut data: &[u8] = b"x";
        let result = storage.save("/etc/passwd", 1, &mut data).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path()).await.unwrap();

        let mut data: &[u8] = b"payload";
        storage.save("blob-1", 7, &mut data).await.unwrap();
        storage.delete("blob-1").await.unwrap();

        assert!(matches!(
            storage.delete("blob-1").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ping_fails_when_root_disappears() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("blobs");
        let storage = LocalBlobStore::new(&root).await.unwrap();
        assert!(storage.ping().await.is_ok());

        std::fs::remove_dir_all(&root).unwrap();
        assert!(matches!(
            storage.ping().await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
