//! Registry record types.

use crate::{ContentDigest, Identifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical mapping between a normalized link and its short identifier.
///
/// Both `identifier` and `content` are unique across the registry. Records
/// are append-only: never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Short hex identifier
    pub identifier: Identifier,
    /// Normalized link the identifier resolves to
    pub content: String,
    /// When the registry accepted the record
    pub created_at: DateTime<Utc>,
}

/// Metadata for a file about to be registered.
///
/// Built from a staged blob once its digest is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewStoredFile {
    /// Opaque handle of the blob in the byte store
    pub storage_handle: String,
    /// SHA-256 of the blob content
    pub digest: ContentDigest,
    /// Filename the uploader supplied
    pub original_name: String,
    /// Bytes actually streamed into the store
    pub size: u64,
    /// Byte store location the handle is relative to
    pub storage_location: String,
}

/// Canonical record of an uploaded file.
///
/// `digest` and `storage_handle` are both unique; exactly one durable blob
/// exists per record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredFile {
    /// Opaque handle of the blob in the byte store
    pub storage_handle: String,
    /// SHA-256 of the blob content
    pub digest: ContentDigest,
    /// Filename supplied by the first uploader of this content
    pub original_name: String,
    /// Size in bytes
    pub size: u64,
    /// Byte store location the handle is relative to
    pub storage_location: String,
    /// When the registry accepted the record
    pub uploaded_at: DateTime<Utc>,
}

impl NewStoredFile {
    /// Stamp the metadata with its registration time.
    pub fn into_stored(self, uploaded_at: DateTime<Utc>) -> StoredFile {
        StoredFile {
            storage_handle: self.storage_handle,
            digest: self.digest,
            original_name: self.original_name,
            size: self.size,
            storage_location: self.storage_location,
            uploaded_at,
        }
    }
}
