//! PostgreSQL registry.
//!
//! Diesel is synchronous, so every query runs on the blocking pool with a
//! connection checked out of the shared r2d2 pool.

use crate::models::{LinkMappingRow, NewLinkMappingRow, NewStoredFileRow, StoredFileRow};
use crate::schema::{link_mappings, stored_files};
use crate::{FileRegistry, Insertion, LinkRegistry, PgPool, UniqueColumn};
use async_trait::async_trait;
use clonebox_core::{ContentDigest, Identifier, LinkRecord, NewStoredFile, StoredFile};
use clonebox_error::{CloneboxResult, DatabaseError, DatabaseErrorKind};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind as DieselKind, Error as DieselError};

/// Map a constraint name from the migrations onto the column it guards.
fn unique_column(constraint: &str) -> Option<UniqueColumn> {
    match constraint {
        "link_mappings_identifier_key" => Some(UniqueColumn::Identifier),
        "link_mappings_content_key" => Some(UniqueColumn::Content),
        "stored_files_digest_key" => Some(UniqueColumn::Digest),
        "stored_files_storage_handle_key" => Some(UniqueColumn::StorageHandle),
        _ => None,
    }
}

/// Turn a unique violation on a known constraint into a conflict outcome.
fn classify_insert<T>(result: Result<T, DieselError>) -> Result<Insertion<T>, DatabaseError> {
    match result {
        Ok(record) => Ok(Insertion::Registered(record)),
        Err(DieselError::DatabaseError(DieselKind::UniqueViolation, info)) => {
            let constraint = info.constraint_name().unwrap_or("unknown");
            match unique_column(constraint) {
                Some(column) => Ok(Insertion::Conflict(column)),
                None => Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation(
                    constraint.to_string(),
                ))),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Database-backed link and file registry.
#[derive(Clone)]
pub struct PostgresRegistry {
    pool: PgPool,
}

impl PostgresRegistry {
    /// Create a registry over an already migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run `op` with a pooled connection on the blocking thread pool.
    async fn run_blocking<T, F>(&self, op: F) -> CloneboxResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Task(e.to_string())))?;
        Ok(outcome?)
    }
}

#[async_trait]
impl LinkRegistry for PostgresRegistry {
    async fn find_by_content(&self, content: &str) -> CloneboxResult<Option<LinkRecord>> {
        let content = content.to_string();
        self.run_blocking(move |conn| {
            let row: Option<LinkMappingRow> = link_mappings::table
                .filter(link_mappings::content.eq(content.as_str()))
                .select(LinkMappingRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(LinkRecord::from))
        })
        .await
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> CloneboxResult<Option<LinkRecord>> {
        let identifier = identifier.clone();
        self.run_blocking(move |conn| {
            let row: Option<LinkMappingRow> = link_mappings::table
                .filter(link_mappings::identifier.eq(identifier.as_str()))
                .select(LinkMappingRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(LinkRecord::from))
        })
        .await
    }

    #[tracing::instrument(skip(self, content))]
    async fn insert_link(
        &self,
        identifier: &Identifier,
        content: &str,
    ) -> CloneboxResult<Insertion<LinkRecord>> {
        let identifier = identifier.clone();
        let content = content.to_string();
        let outcome = self
            .run_blocking(move |conn| {
                let row = NewLinkMappingRow {
                    identifier: identifier.as_str(),
                    content: &content,
                };
                let inserted: QueryResult<LinkMappingRow> =
                    diesel::insert_into(link_mappings::table)
                        .values(&row)
                        .returning(LinkMappingRow::as_returning())
                        .get_result(conn);
                classify_insert(inserted.map(LinkRecord::from))
            })
            .await?;

        if let Insertion::Conflict(column) = &outcome {
            tracing::debug!(%column, "Link insert hit uniqueness constraint");
        }
        Ok(outcome)
    }

    async fn latest_links(&self, limit: usize) -> CloneboxResult<Vec<LinkRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.run_blocking(move |conn| {
            let rows: Vec<LinkMappingRow> = link_mappings::table
                .order(link_mappings::id.desc())
                .limit(limit)
                .select(LinkMappingRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(LinkRecord::from).collect())
        })
        .await
    }
}

#[async_trait]
impl FileRegistry for PostgresRegistry {
    async fn find_by_digest(&self, digest: &ContentDigest) -> CloneboxResult<Option<StoredFile>> {
        let digest = digest.clone();
        self.run_blocking(move |conn| {
            let row: Option<StoredFileRow> = stored_files::table
                .filter(stored_files::digest.eq(digest.as_str()))
                .select(StoredFileRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(StoredFile::from))
        })
        .await
    }

    async fn find_by_handle(&self, handle: &str) -> CloneboxResult<Option<StoredFile>> {
        let handle = handle.to_string();
        self.run_blocking(move |conn| {
            let row: Option<StoredFileRow> = stored_files::table
                .filter(stored_files::storage_handle.eq(handle.as_str()))
                .select(StoredFileRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(StoredFile::from))
        })
        .await
    }

    #[tracing::instrument(skip(self, file), fields(handle = %file.storage_handle))]
    async fn insert_file(&self, file: NewStoredFile) -> CloneboxResult<Insertion<StoredFile>> {
        // Validate before leaving the async context so the error keeps its kind.
        NewStoredFileRow::try_from(&file)?;

        let outcome = self
            .run_blocking(move |conn| {
                let row = NewStoredFileRow::try_from(&file).map_err(|e| {
                    DatabaseError::new(DatabaseErrorKind::Query(e.to_string()))
                })?;
                let inserted: QueryResult<StoredFileRow> =
                    diesel::insert_into(stored_files::table)
                        .values(&row)
                        .returning(StoredFileRow::as_returning())
                        .get_result(conn);
                classify_insert(inserted.map(StoredFile::from))
            })
            .await?;

        if let Insertion::Conflict(column) = &outcome {
            tracing::debug!(%column, "File insert hit uniqueness constraint");
        }
        Ok(outcome)
    }
}
