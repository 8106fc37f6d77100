//! In-memory blob storage for tests.

use crate::streaming::copy_hashing;
use crate::{BlobReader, ContentStore, Disposition, StagedBlob};
use clonebox_error::{CloneboxResult, StorageError, StorageErrorKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct MemoryBlob {
    data: Arc<Vec<u8>>,
    staged: bool,
    written_at: Instant,
}

/// In-memory content store.
///
/// Stores blobs in a HashMap behind a mutex; all data is lost when the last
/// clone is dropped. Clones share the same blobs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    blobs: Arc<Mutex<HashMap<String, MemoryBlob>>>,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs held, staged or canonical (for testing).
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Check if the store holds no blobs (for testing).
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Number of blobs still waiting for promote or discard (for testing).
    pub fn staged_count(&self) -> usize {
        self.blobs.lock().values().filter(|b| b.staged).count()
    }

    fn not_found(handle: &str) -> StorageError {
        StorageError::new(StorageErrorKind::NotFound(handle.to_string()))
    }

    fn settle(&self, handle: &str, disposition: Disposition) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock();
        match disposition {
            Disposition::Promote => match blobs.get_mut(handle) {
                Some(blob) if blob.staged => {
                    blob.staged = false;
                    Ok(())
                }
                _ => Err(Self::not_found(handle)),
            },
            Disposition::Discard => {
                if blobs.get(handle).is_some_and(|b| b.staged) {
                    blobs.remove(handle);
                }
                Ok(())
            }
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for InMemoryStorage {
    fn location(&self) -> &str {
        "memory"
    }

    async fn begin_write(
        &self,
        source: &mut (dyn AsyncRead + Send + Unpin),
    ) -> CloneboxResult<StagedBlob> {
        let mut data = Vec::new();
        let (digest, size) = copy_hashing(source, &mut data).await?;

        let handle = Uuid::new_v4().to_string();
        self.blobs.lock().insert(
            handle.clone(),
            MemoryBlob {
                data: Arc::new(data),
                staged: true,
                written_at: Instant::now(),
            },
        );

        Ok(StagedBlob {
            handle,
            digest,
            size,
        })
    }

    async fn promote(&self, handle: &str) -> CloneboxResult<String> {
        self.settle(handle, Disposition::Promote)?;
        Ok(handle.to_string())
    }

    async fn discard(&self, handle: &str) -> CloneboxResult<()> {
        self.settle(handle, Disposition::Discard)?;
        Ok(())
    }

    async fn open(&self, handle: &str) -> CloneboxResult<BlobReader> {
        let blobs = self.blobs.lock();
        match blobs.get(handle) {
            Some(blob) if !blob.staged => {
                Ok(Box::new(std::io::Cursor::new(blob.data.as_ref().clone())))
            }
            _ => Err(Self::not_found(handle).into()),
        }
    }

    async fn exists(&self, handle: &str) -> CloneboxResult<bool> {
        Ok(self.blobs.lock().contains_key(handle))
    }

    async fn sweep_staging(&self, older_than: Duration) -> CloneboxResult<usize> {
        let mut blobs = self.blobs.lock();
        let before = blobs.len();
        blobs.retain(|_, blob| !(blob.staged && blob.written_at.elapsed() >= older_than));
        Ok(before - blobs.len())
    }

    fn settle_blocking(&self, handle: &str, disposition: Disposition) -> CloneboxResult<()> {
        self.settle(handle, disposition)?;
        Ok(())
    }
}
