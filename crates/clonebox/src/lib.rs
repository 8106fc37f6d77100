//! Clonebox: content-derived link identifiers and deduplicated uploads.
//!
//! Two services share one idea: derive an identity from content, then let
//! the registry's uniqueness constraints decide which submission becomes
//! canonical.
//!
//! - [`LinkShortener`] maps each normalized link to a short hex identifier
//!   taken from its SHA-256, walking a deterministic candidate chain when a
//!   truncated identifier is already owned by another link.
//! - [`FileUploader`] streams each upload once into staging while hashing it,
//!   then promotes the blob or discards it as a duplicate.
//!
//! # Example
//!
//! ```rust
//! use clonebox::{Clonebox, CloneboxConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = Clonebox::in_memory(CloneboxConfig::default())?;
//!
//! let first = app.links().shorten_link("https://example.com").await?;
//! let again = app.links().shorten_link("example.com").await?;
//! assert_eq!(first.identifier(), again.identifier());
//! assert!(again.was_existing);
//!
//! let upload = app.files().upload_file(&b"hello"[..], "hello.txt", Some(5)).await?;
//! assert!(!upload.was_duplicate);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `database` - PostgreSQL registry; required by the `clonebox` binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod app;
mod cli;
mod config;
mod files;
mod links;
mod observability;

pub use app::Clonebox;
#[cfg(feature = "database")]
pub use app::migrate;
pub use cli::{Cli, Commands};
pub use config::{CloneboxConfig, DatabaseConfig, FilesConfig, LinksConfig, LoggingConfig};
pub use files::{DEFAULT_MAX_UPLOAD_BYTES, FileUploader, UploadOutcome};
pub use links::{DEFAULT_MAX_ATTEMPTS, LinkShortener, ShortenedLink};
pub use observability::init_logging;

pub use clonebox_core::{
    ContentDigest, Identifier, IdentifierResolver, LinkRecord, Sha256Resolver, StoredFile,
};
pub use clonebox_database::{FileRegistry, InMemoryRegistry, Insertion, LinkRegistry, UniqueColumn};
pub use clonebox_error::{CloneboxError, CloneboxErrorKind, CloneboxResult, ResourceLeak};
pub use clonebox_storage::{ContentStore, FileSystemStorage, InMemoryStorage};
