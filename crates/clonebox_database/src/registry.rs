//! Registry traits and insert outcomes.

use async_trait::async_trait;
use clonebox_core::{ContentDigest, Identifier, LinkRecord, NewStoredFile, StoredFile};
use clonebox_error::CloneboxResult;

/// Column whose uniqueness constraint rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum UniqueColumn {
    /// Link identifier already taken by some link
    #[display("identifier")]
    Identifier,
    /// This exact link is already registered
    #[display("content")]
    Content,
    /// A file with the same bytes is already registered
    #[display("digest")]
    Digest,
    /// Storage handle reused (never expected: handles are fresh UUIDs)
    #[display("storage_handle")]
    StorageHandle,
}

/// Outcome of an insert: either the record is now canonical, or a uniqueness
/// constraint said no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion<T> {
    /// Record committed
    Registered(T),
    /// Uniqueness violation on the named column
    Conflict(UniqueColumn),
}

impl<T> Insertion<T> {
    /// The committed record, if any.
    pub fn registered(self) -> Option<T> {
        match self {
            Insertion::Registered(record) => Some(record),
            Insertion::Conflict(_) => None,
        }
    }
}

/// Append-only mapping between normalized links and identifiers.
///
/// Both `identifier` and `content` are unique.
#[async_trait]
pub trait LinkRegistry: Send + Sync {
    /// Look up the record for a normalized link.
    async fn find_by_content(&self, content: &str) -> CloneboxResult<Option<LinkRecord>>;

    /// Look up the link an identifier resolves to.
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> CloneboxResult<Option<LinkRecord>>;

    /// Register `content` under `identifier`.
    ///
    /// Returns `Conflict` when either column is already taken. Any other
    /// failure is an error.
    async fn insert_link(
        &self,
        identifier: &Identifier,
        content: &str,
    ) -> CloneboxResult<Insertion<LinkRecord>>;

    /// Most recently registered links, newest first.
    async fn latest_links(&self, limit: usize) -> CloneboxResult<Vec<LinkRecord>>;
}

/// Append-only mapping between content digests and stored blobs.
///
/// Both `digest` and `storage_handle` are unique.
#[async_trait]
pub trait FileRegistry: Send + Sync {
    /// Look up the canonical file with the given content digest.
    async fn find_by_digest(&self, digest: &ContentDigest) -> CloneboxResult<Option<StoredFile>>;

    /// Look up a file by its storage handle.
    async fn find_by_handle(&self, handle: &str) -> CloneboxResult<Option<StoredFile>>;

    /// Register a staged blob as the canonical copy of its content.
    ///
    /// Returns `Conflict(Digest)` when another upload of the same bytes won.
    async fn insert_file(&self, file: NewStoredFile) -> CloneboxResult<Insertion<StoredFile>>;
}
