//! Record registry for Clonebox.
//!
//! The registry is the only authority on uniqueness. Each table carries a
//! uniqueness constraint per key column and `insert` reports a violation as
//! [`Insertion::Conflict`] instead of an error, so the link and file services
//! can retry or fall back to the winning record. Lookups by content or digest
//! are only a fast path in front of the insert.
//!
//! # Features
//!
//! - `postgres` - Diesel-based PostgreSQL registry with embedded migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use clonebox_database::{establish_pool, run_migrations, PostgresRegistry};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = establish_pool("postgres://localhost/clonebox", 8)?;
//! run_migrations(&pool)?;
//! let registry = PostgresRegistry::new(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;
mod registry;

#[cfg(feature = "postgres")]
mod connection;
#[cfg(feature = "postgres")]
mod models;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

pub use memory::InMemoryRegistry;
pub use registry::{FileRegistry, Insertion, LinkRegistry, UniqueColumn};

#[cfg(feature = "postgres")]
pub use connection::{PgPool, establish_pool, run_migrations};
#[cfg(feature = "postgres")]
pub use models::{LinkMappingRow, NewLinkMappingRow, NewStoredFileRow, StoredFileRow};
#[cfg(feature = "postgres")]
pub use postgres::PostgresRegistry;

#[cfg(feature = "postgres")]
use clonebox_error::DatabaseError;

/// Result type for database operations.
#[cfg(feature = "postgres")]
pub type DatabaseResult<T> = Result<T, DatabaseError>;
