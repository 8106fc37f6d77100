//! Storage error types.

/// Kinds of byte store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to read from the upload stream
    #[display("Failed to read upload stream: {}", _0)]
    StreamRead(String),
    /// Failed to write file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Failed to move a staged blob into the canonical area
    #[display("Failed to promote blob: {}", _0)]
    Promote(String),
    /// Failed to remove a blob
    #[display("Failed to discard blob: {}", _0)]
    Discard(String),
    /// Blob not found for the given handle
    #[display("Blob not found: {}", _0)]
    NotFound(String),
    /// Handle is not a valid storage handle
    #[display("Invalid storage handle: {}", _0)]
    InvalidHandle(String),
    /// Registry already holds a record for a freshly staged handle
    #[display("Storage handle already registered: {}", _0)]
    HandleConflict(String),
    /// The task settling a staged blob did not finish
    #[display("Upload settlement interrupted: {}", _0)]
    Settlement(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use clonebox_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("4f1c".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
