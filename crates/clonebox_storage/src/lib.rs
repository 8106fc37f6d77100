//! Staged blob storage for Clonebox uploads.
//!
//! A blob's life is `begin_write` (staged, digest known) followed by exactly one
//! of `promote` (canonical, readable by handle) or `discard` (gone). The store
//! never decides which; the file registry's insert outcome does.
//!
//! # Features
//!
//! - **Single pass**: the upload stream is read once; every chunk goes to the
//!   staging file and the SHA-256 accumulator together
//! - **Collision-free staging**: handles are fresh UUIDs, unrelated to content
//! - **Pluggable backends**: filesystem for production, in-memory for tests
//!
//! # Example
//!
//! ```rust
//! use clonebox_storage::{ContentStore, FileSystemStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = FileSystemStorage::new("/tmp/clonebox")?;
//!
//! let mut upload: &[u8] = b"hello";
//! let staged = storage.begin_write(&mut upload).await?;
//! assert_eq!(staged.size, 5);
//!
//! let handle = storage.promote(&staged.handle).await?;
//! let mut reader = storage.open(&handle).await?;
//! # let _ = &mut reader;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod memory;
mod store;
mod streaming;

pub use clonebox_error::{StorageError, StorageErrorKind};
pub use filesystem::FileSystemStorage;
pub use memory::InMemoryStorage;
pub use store::{BlobReader, ContentStore, Disposition, StagedBlob};
