//! Core data types for Clonebox.
//!
//! This crate holds the records shared by the registry, the byte store and the
//! services on top of them, plus the two pure pieces of the link pipeline:
//! normalizing a submitted link and deriving short identifiers from content.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ids;
mod link;
mod records;
mod resolver;

pub use ids::{ContentDigest, Identifier};
pub use link::normalize_link;
pub use records::{LinkRecord, NewStoredFile, StoredFile};
pub use resolver::{DEFAULT_IDENTIFIER_BYTES, IdentifierResolver, Sha256Resolver};
