//! Database connection utilities.

use crate::DatabaseResult;
use clonebox_error::{DatabaseError, DatabaseErrorKind};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Shared PostgreSQL connection pool.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Build a connection pool for the given database URL.
///
/// # Errors
///
/// Returns an error if the pool cannot open its initial connections.
#[tracing::instrument(skip(database_url))]
pub fn establish_pool(database_url: &str, max_connections: u32) -> DatabaseResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_connections)
        .build(manager)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))?;

    tracing::info!(max_connections, "Opened database pool");
    Ok(pool)
}

/// Apply any pending embedded migrations.
///
/// Creates the `link_mappings` and `stored_files` tables together with the
/// uniqueness constraints the registry relies on.
#[tracing::instrument(skip(pool))]
pub fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))?;

    tracing::info!(applied = applied.len(), "Applied migrations");
    Ok(())
}
