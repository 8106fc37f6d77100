//! Filesystem-based blob storage implementation.
//!
//! Uploads land in a staging directory under a fresh UUID and are renamed into
//! the canonical tree on promotion. Both directories live under one base path
//! so promotion is a same-filesystem rename.

use crate::streaming::copy_hashing;
use crate::{BlobReader, ContentStore, Disposition, StagedBlob};
use clonebox_error::{CloneboxResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Filesystem storage backend.
///
/// Layout:
///
/// ```text
/// {base_path}/
/// ├── staging/
/// │   └── 6f1d9c2e-...        (written, not yet settled)
/// └── blobs/
///     └── 3a/
///         └── 3a07b1f4-...    (canonical)
/// ```
///
/// Canonical blobs are sharded by the first two characters of their handle to
/// keep directories small.
pub struct FileSystemStorage {
    base_path: PathBuf,
    location: String,
}

impl FileSystemStorage {
    /// Create a new filesystem storage backend.
    ///
    /// Creates the base, staging and blob directories if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be created or accessed.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> CloneboxResult<Self> {
        let base_path = base_path.into();

        for dir in [base_path.join("staging"), base_path.join("blobs")] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
            })?;
        }

        let location = base_path.to_string_lossy().to_string();
        tracing::info!(path = %base_path.display(), "Opened filesystem storage");
        Ok(Self {
            base_path,
            location,
        })
    }

    /// Root directory of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Handles are UUIDs; anything else could escape the base directory.
    fn check_handle(handle: &str) -> Result<(), StorageError> {
        Uuid::parse_str(handle)
            .map(|_| ())
            .map_err(|_| StorageError::new(StorageErrorKind::InvalidHandle(handle.to_string())))
    }

    fn staging_path(&self, handle: &str) -> PathBuf {
        self.base_path.join("staging").join(handle)
    }

    /// Structure: `{base}/blobs/{handle[0:2]}/{handle}`
    fn blob_path(&self, handle: &str) -> PathBuf {
        self.base_path
            .join("blobs")
            .join(&handle[0..2])
            .join(handle)
    }

}

/// Removes a staging file that never became a [`StagedBlob`].
///
/// Dropping the write future mid-stream drops this too, so a stalled or
/// cancelled upload does not leave its partial bytes behind.
struct PartialStaging {
    path: Option<PathBuf>,
}

impl PartialStaging {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// The file is handed over (or was never created); leave it alone.
    fn keep(&mut self) {
        self.path = None;
    }
}

impl Drop for PartialStaging {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed partial staging file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial staging file");
            }
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for FileSystemStorage {
    fn location(&self) -> &str {
        &self.location
    }

    #[tracing::instrument(skip(self, source))]
    async fn begin_write(
        &self,
        source: &mut (dyn AsyncRead + Send + Unpin),
    ) -> CloneboxResult<StagedBlob> {
        let handle = Uuid::new_v4().to_string();
        let path = self.staging_path(&handle);
        let mut partial = PartialStaging::new(path.clone());

        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match opened {
            Ok(file) => file,
            Err(e) => {
                partial.keep();
                return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };

        let (digest, size) = copy_hashing(source, &mut file).await?;

        file.sync_all().await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "sync {}: {}",
                path.display(),
                e
            )))
        })?;
        drop(file);
        partial.keep();

        tracing::debug!(handle = %handle, digest = %digest, size, "Staged upload");
        Ok(StagedBlob {
            handle,
            digest,
            size,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn promote(&self, handle: &str) -> CloneboxResult<String> {
        Self::check_handle(handle)?;
        let staged = self.staging_path(handle);
        let path = self.blob_path(handle);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        tokio::fs::rename(&staged, &path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(handle.to_string()))
            } else {
                StorageError::new(StorageErrorKind::Promote(format!(
                    "rename {} to {}: {}",
                    staged.display(),
                    path.display(),
                    e
                )))
            }
        })?;

        tracing::info!(handle, path = %path.display(), "Promoted blob");
        Ok(handle.to_string())
    }

    #[tracing::instrument(skip(self))]
    async fn discard(&self, handle: &str) -> CloneboxResult<()> {
        Self::check_handle(handle)?;
        let path = self.staging_path(handle);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(handle, "Discarded staged blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(handle, "Staged blob already gone");
                Ok(())
            }
            Err(e) => Err(StorageError::new(StorageErrorKind::Discard(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn open(&self, handle: &str) -> CloneboxResult<BlobReader> {
        Self::check_handle(handle)?;
        let path = self.blob_path(handle);

        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(handle.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        Ok(Box::new(file))
    }

    async fn exists(&self, handle: &str) -> CloneboxResult<bool> {
        Self::check_handle(handle)?;
        for path in [self.staging_path(handle), self.blob_path(handle)] {
            if tokio::fs::try_exists(&path).await.map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    #[tracing::instrument(skip(self))]
    async fn sweep_staging(&self, older_than: Duration) -> CloneboxResult<usize> {
        let staging = self.base_path.join("staging");
        let read_err = |e: std::io::Error| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                staging.display(),
                e
            )))
        };

        let mut entries = tokio::fs::read_dir(&staging).await.map_err(read_err)?;
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < older_than {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Sweep could not remove staged blob");
                }
            }
        }

        tracing::info!(removed, "Swept staging area");
        Ok(removed)
    }

    fn settle_blocking(&self, handle: &str, disposition: Disposition) -> CloneboxResult<()> {
        Self::check_handle(handle)?;
        let staged = self.staging_path(handle);

        let result = match disposition {
            Disposition::Discard => match std::fs::remove_file(&staged) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
            Disposition::Promote => {
                let path = self.blob_path(handle);
                match path.parent() {
                    Some(parent) => std::fs::create_dir_all(parent),
                    None => Ok(()),
                }
                .and_then(|_| std::fs::rename(&staged, &path))
            }
        };

        result.map_err(|e| {
            let detail = format!("{}: {}", staged.display(), e);
            let err = match disposition {
                Disposition::Promote => StorageError::new(StorageErrorKind::Promote(detail)),
                Disposition::Discard => StorageError::new(StorageErrorKind::Discard(detail)),
            };
            err.into()
        })
    }
}
