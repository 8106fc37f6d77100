//! Diesel row types for the registry tables.

use crate::schema::{link_mappings, stored_files};
use chrono::{DateTime, Utc};
use clonebox_core::{ContentDigest, Identifier, LinkRecord, NewStoredFile, StoredFile};
use clonebox_error::{ContentError, ContentErrorKind};
use diesel::prelude::*;

/// Row of `link_mappings`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = link_mappings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LinkMappingRow {
    /// Surrogate key, used only for recency ordering
    pub id: i64,
    /// Short identifier
    pub identifier: String,
    /// Normalized link
    pub content: String,
    /// Insert time
    pub created_at: DateTime<Utc>,
}

/// Insertable `link_mappings` row.
#[derive(Debug, Insertable)]
#[diesel(table_name = link_mappings)]
pub struct NewLinkMappingRow<'a> {
    /// Short identifier
    pub identifier: &'a str,
    /// Normalized link
    pub content: &'a str,
}

impl From<LinkMappingRow> for LinkRecord {
    fn from(row: LinkMappingRow) -> Self {
        LinkRecord {
            identifier: Identifier::new(row.identifier),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Row of `stored_files`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = stored_files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoredFileRow {
    /// Surrogate key
    pub id: i64,
    /// Blob handle in the byte store
    pub storage_handle: String,
    /// Lowercase hex SHA-256
    pub digest: String,
    /// Uploader-supplied filename
    pub original_name: String,
    /// Size in bytes (never negative, enforced by a CHECK constraint)
    pub size_bytes: i64,
    /// Byte store location
    pub storage_location: String,
    /// Insert time
    pub uploaded_at: DateTime<Utc>,
}

/// Insertable `stored_files` row.
#[derive(Debug, Insertable)]
#[diesel(table_name = stored_files)]
pub struct NewStoredFileRow<'a> {
    /// Blob handle in the byte store
    pub storage_handle: &'a str,
    /// Lowercase hex SHA-256
    pub digest: &'a str,
    /// Uploader-supplied filename
    pub original_name: &'a str,
    /// Size in bytes
    pub size_bytes: i64,
    /// Byte store location
    pub storage_location: &'a str,
}

impl<'a> TryFrom<&'a NewStoredFile> for NewStoredFileRow<'a> {
    type Error = ContentError;

    fn try_from(file: &'a NewStoredFile) -> Result<Self, Self::Error> {
        let size_bytes = i64::try_from(file.size).map_err(|_| {
            ContentError::new(ContentErrorKind::TooLarge {
                limit: i64::MAX as u64,
            })
        })?;
        Ok(Self {
            storage_handle: &file.storage_handle,
            digest: file.digest.as_str(),
            original_name: &file.original_name,
            size_bytes,
            storage_location: &file.storage_location,
        })
    }
}

impl From<StoredFileRow> for StoredFile {
    fn from(row: StoredFileRow) -> Self {
        StoredFile {
            storage_handle: row.storage_handle,
            digest: ContentDigest::new(row.digest),
            original_name: row.original_name,
            size: u64::try_from(row.size_bytes).unwrap_or_default(),
            storage_location: row.storage_location,
            uploaded_at: row.uploaded_at,
        }
    }
}
