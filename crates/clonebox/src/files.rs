//! Deduplicated file uploads.
//!
//! An upload is streamed once into a staging slot of the byte store, which
//! yields its digest. The file registry then decides the blob's fate:
//! a successful insert promotes it, a digest conflict discards it and the
//! existing record is returned instead.
//!
//! ```text
//! Staged --insert--> Registered --promote--> canonical
//!        \--conflict(digest)--> discard --> duplicate of the winner
//! ```
//!
//! Once the bytes are staged, settlement runs on its own task. Dropping the
//! upload future then cannot separate a committed record from its blob.

use clonebox_core::{ContentDigest, NewStoredFile, StoredFile};
use clonebox_database::{FileRegistry, Insertion, UniqueColumn};
use clonebox_error::{
    CloneboxResult, ContentError, ContentErrorKind, ResourceLeak, StorageError, StorageErrorKind,
};
use clonebox_storage::{BlobReader, ContentStore, Disposition, StagedBlob};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{Instrument, debug, info, instrument, warn};

/// Default upload ceiling (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Canonical record for the uploaded bytes
    pub file: StoredFile,
    /// True when identical bytes were already stored
    pub was_duplicate: bool,
    /// Staged blob that could not be cleaned up, if any
    pub leak: Option<ResourceLeak>,
}

/// Stores uploads so each distinct content is kept exactly once.
#[derive(Clone)]
pub struct FileUploader {
    registry: Arc<dyn FileRegistry>,
    store: Arc<dyn ContentStore>,
    max_upload_bytes: Option<u64>,
}

impl FileUploader {
    /// Create an uploader over the given registry and byte store.
    pub fn new(registry: Arc<dyn FileRegistry>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            registry,
            store,
            max_upload_bytes: Some(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    /// Set the upload ceiling; `None` accepts any size.
    pub fn with_max_upload_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Store the bytes of `source`, or find the identical file already stored.
    ///
    /// `declared_size` is advisory; the recorded size is what was streamed.
    ///
    /// # Errors
    ///
    /// - `TooLarge` if the stream exceeds the configured ceiling
    /// - Storage and registry failures are propagated. An unregistered staged
    ///   blob is removed; a registered one is kept and promotion retried
    /// - `HandleConflict` if the registry already holds the staged handle
    #[instrument(skip(self, source), fields(declared_name = %declared_name))]
    pub async fn upload_file<R>(
        &self,
        source: R,
        declared_name: &str,
        declared_size: Option<u64>,
    ) -> CloneboxResult<UploadOutcome>
    where
        R: AsyncRead + Send + Unpin,
    {
        let staged = match self.max_upload_bytes {
            Some(limit) => {
                // One byte past the limit is enough to know it was exceeded.
                let mut bounded = source.take(limit.saturating_add(1));
                let staged = self.store.begin_write(&mut bounded).await?;
                if staged.size > limit {
                    if let Err(e) = self.store.discard(&staged.handle).await {
                        warn!(
                            handle = %staged.handle,
                            error = %e,
                            "Failed to discard oversized upload"
                        );
                    }
                    return Err(ContentError::new(ContentErrorKind::TooLarge { limit }).into());
                }
                staged
            }
            None => {
                let mut source = source;
                self.store.begin_write(&mut source).await?
            }
        };

        if let Some(declared) = declared_size.filter(|d| *d != staged.size) {
            warn!(declared, streamed = staged.size, "Declared size does not match upload");
        }

        // The registry may commit even if this future is dropped (a blocking
        // insert keeps running), so the blob's fate is decided on a task of
        // its own that sees the registry's answer through to the store.
        let uploader = self.clone();
        let declared_name = declared_name.to_string();
        let settlement = tokio::spawn(
            async move { uploader.settle_staged(staged, &declared_name).await }.in_current_span(),
        );

        match settlement.await {
            Ok(outcome) => outcome,
            Err(e) => Err(StorageError::new(StorageErrorKind::Settlement(e.to_string())).into()),
        }
    }

    async fn settle_staged(
        &self,
        staged: StagedBlob,
        declared_name: &str,
    ) -> CloneboxResult<UploadOutcome> {
        let handle = staged.handle.clone();
        let mut guard = StagedGuard::new(self.store.clone(), handle.clone());
        let outcome = self.settle(staged, declared_name, &mut guard).await;

        if outcome.is_err() && guard.pending == Some(Disposition::Discard) {
            guard.disarm();
            if let Err(e) = self.store.discard(&handle).await {
                warn!(%handle, error = %e, "Failed to discard staged blob after error");
            }
        }
        outcome
    }

    async fn settle(
        &self,
        staged: StagedBlob,
        declared_name: &str,
        guard: &mut StagedGuard,
    ) -> CloneboxResult<UploadOutcome> {
        if let Some(existing) = self.registry.find_by_digest(&staged.digest).await? {
            debug!(handle = %existing.storage_handle, "Content already stored");
            let leak = self.discard_duplicate(guard).await;
            return Ok(UploadOutcome {
                file: existing,
                was_duplicate: true,
                leak,
            });
        }

        let candidate = NewStoredFile {
            storage_handle: staged.handle.clone(),
            digest: staged.digest.clone(),
            original_name: declared_name.to_string(),
            size: staged.size,
            storage_location: self.store.location().to_string(),
        };

        match self.registry.insert_file(candidate).await? {
            Insertion::Registered(file) => {
                // From here on the record points at this blob, so it must be kept.
                guard.arm(Disposition::Promote);
                if let Err(e) = self.store.promote(&staged.handle).await {
                    warn!(handle = %staged.handle, error = %e, "Promote failed, retrying");
                    // Still armed with Promote on failure, so dropping the
                    // guard makes one more attempt.
                    self.retry_promote(&staged.handle).await?;
                }
                guard.disarm();

                info!(handle = %file.storage_handle, size = file.size, "Stored file");
                Ok(UploadOutcome {
                    file,
                    was_duplicate: false,
                    leak: None,
                })
            }
            Insertion::Conflict(UniqueColumn::Digest) => {
                let winner = self.winner(&staged.digest).await?;
                debug!(handle = %winner.storage_handle, "Concurrent upload of same content won");
                let leak = self.discard_duplicate(guard).await;
                Ok(UploadOutcome {
                    file: winner,
                    was_duplicate: true,
                    leak,
                })
            }
            Insertion::Conflict(column) => {
                let mut reason = format!("{} conflict for staged blob {}", column, staged.handle);
                if let Some(leak) = self.discard_duplicate(guard).await {
                    warn!(%leak, %column, "Conflicting upload left behind");
                    reason = format!("{}; {}", reason, leak);
                }
                Err(StorageError::new(StorageErrorKind::HandleConflict(reason)).into())
            }
        }
    }

    /// Promote through the store's blocking path, off the async runtime.
    async fn retry_promote(&self, handle: &str) -> CloneboxResult<()> {
        let store = self.store.clone();
        let owned = handle.to_string();
        tokio::task::spawn_blocking(move || store.settle_blocking(&owned, Disposition::Promote))
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Settlement(e.to_string())))?
    }

    async fn winner(&self, digest: &ContentDigest) -> CloneboxResult<StoredFile> {
        self.registry.find_by_digest(digest).await?.ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(format!(
                "file with digest {}",
                digest
            )))
            .into()
        })
    }

    /// Remove a staged duplicate, reporting failure as a leak.
    async fn discard_duplicate(&self, guard: &mut StagedGuard) -> Option<ResourceLeak> {
        let discarded = self.store.discard(&guard.handle).await;
        guard.disarm();
        match discarded {
            Ok(()) => None,
            Err(e) => {
                let leak = ResourceLeak::new(guard.handle.clone(), &e);
                warn!(%leak, "Duplicate upload left behind");
                Some(leak)
            }
        }
    }

    /// Look up a stored file by its handle.
    pub async fn file_by_handle(&self, handle: &str) -> CloneboxResult<Option<StoredFile>> {
        self.registry.find_by_handle(handle).await
    }

    /// Open a stored file for reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no file is registered under `handle`.
    #[instrument(skip(self))]
    pub async fn open_file(&self, handle: &str) -> CloneboxResult<(StoredFile, BlobReader)> {
        let file = self.registry.find_by_handle(handle).await?.ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(handle.to_string()))
        })?;
        let reader = self.store.open(&file.storage_handle).await?;
        Ok((file, reader))
    }

    /// Remove staged blobs older than `older_than`.
    pub async fn sweep(&self, older_than: Duration) -> CloneboxResult<usize> {
        let removed = self.store.sweep_staging(older_than).await?;
        if removed > 0 {
            info!(removed, "Swept stale staged blobs");
        }
        Ok(removed)
    }
}

/// Settles a staged blob if the settlement task unwinds or is torn down
/// before reaching a decision.
///
/// Armed with `Discard` while the blob's fate is undecided and with `Promote`
/// once the registry has committed a record pointing at it.
struct StagedGuard {
    store: Arc<dyn ContentStore>,
    handle: String,
    pending: Option<Disposition>,
}

impl StagedGuard {
    fn new(store: Arc<dyn ContentStore>, handle: String) -> Self {
        Self {
            store,
            handle,
            pending: Some(Disposition::Discard),
        }
    }

    fn arm(&mut self, disposition: Disposition) {
        self.pending = Some(disposition);
    }

    fn disarm(&mut self) {
        self.pending = None;
    }
}

impl Drop for StagedGuard {
    fn drop(&mut self) {
        let Some(disposition) = self.pending.take() else {
            return;
        };
        warn!(handle = %self.handle, ?disposition, "Staged blob unsettled, finishing in background");

        let store = self.store.clone();
        let handle = std::mem::take(&mut self.handle);
        let settle = move || {
            if let Err(e) = store.settle_blocking(&handle, disposition) {
                warn!(%handle, error = %e, "Failed to settle cancelled upload");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(settle);
            }
            Err(_) => settle(),
        }
    }
}
