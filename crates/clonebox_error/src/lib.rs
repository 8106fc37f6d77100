//! Error types for the Clonebox library.
//!
//! This crate provides the foundation error types used throughout the Clonebox workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Uniqueness conflicts are deliberately absent from this hierarchy. A registry
//! insert that violates a uniqueness constraint is an expected outcome that the
//! link and file services resolve internally, so it is modelled as a value
//! (`Insertion::Conflict` in `clonebox_database`) and never travels as an error.
//!
//! # Examples
//!
//! ```
//! use clonebox_error::{CloneboxResult, ContentError, ContentErrorKind};
//!
//! fn validate(link: &str) -> CloneboxResult<&str> {
//!     if link.is_empty() {
//!         Err(ContentError::new(ContentErrorKind::InvalidContent("empty link".into())))?
//!     }
//!     Ok(link)
//! }
//!
//! let err = validate("").unwrap_err();
//! assert!(err.is_invalid_content());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod content;
#[cfg(feature = "database")]
mod database;
mod error;
mod leak;
mod storage;

pub use config::ConfigError;
pub use content::{ContentError, ContentErrorKind};
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{CloneboxError, CloneboxErrorKind, CloneboxResult};
pub use leak::ResourceLeak;
pub use storage::{StorageError, StorageErrorKind};
