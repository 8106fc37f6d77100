//! Content store trait definition.

use clonebox_core::ContentDigest;
use clonebox_error::CloneboxResult;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Stream over a canonical blob's bytes.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Result of streaming an upload into staging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagedBlob {
    /// Fresh handle, unique per write attempt
    pub handle: String,
    /// SHA-256 over every byte written
    pub digest: ContentDigest,
    /// Number of bytes written
    pub size: u64,
}

/// How a staged blob is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Make the blob canonical
    Promote,
    /// Remove the blob
    Discard,
}

/// Durable byte store owning the staged/canonical blob lifecycle.
///
/// Implementations handle the bytes only; which staged blob becomes canonical
/// is decided by the registry.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Where this store keeps canonical blobs (recorded next to each file).
    fn location(&self) -> &str;

    /// Stream `source` into a new staging slot, hashing in the same pass.
    ///
    /// `source` is read exactly once, to EOF. On any read or write failure the
    /// partial staging slot is removed before the error is returned.
    async fn begin_write(
        &self,
        source: &mut (dyn AsyncRead + Send + Unpin),
    ) -> CloneboxResult<StagedBlob>;

    /// Mark a staged blob canonical and return its final handle.
    async fn promote(&self, handle: &str) -> CloneboxResult<String>;

    /// Remove a staged blob. Removing a slot that is already gone succeeds.
    async fn discard(&self, handle: &str) -> CloneboxResult<()>;

    /// Open a canonical blob for reading. Staged blobs are not readable.
    async fn open(&self, handle: &str) -> CloneboxResult<BlobReader>;

    /// Whether a blob exists under `handle`, staged or canonical.
    async fn exists(&self, handle: &str) -> CloneboxResult<bool>;

    /// Remove staged blobs older than `older_than`, returning how many went.
    ///
    /// Reconciliation backstop for leaked staging slots; upload correctness
    /// never depends on it.
    async fn sweep_staging(&self, older_than: Duration) -> CloneboxResult<usize>;

    /// Settle a staged blob without awaiting.
    ///
    /// Used from `Drop` when an upload future is cancelled between staging and
    /// settlement, so it must not touch the async runtime.
    fn settle_blocking(&self, handle: &str, disposition: Disposition) -> CloneboxResult<()>;
}
