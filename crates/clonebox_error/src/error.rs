//! Top-level error wrapper types.

use crate::{ConfigError, ContentError, ContentErrorKind, StorageError};
#[cfg(feature = "database")]
use crate::DatabaseError;

/// Every failure that can escape the Clonebox core.
///
/// # Examples
///
/// ```
/// use clonebox_error::{CloneboxError, StorageError, StorageErrorKind};
///
/// let storage_err = StorageError::new(StorageErrorKind::FileWrite("disk full".into()));
/// let err: CloneboxError = storage_err.into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CloneboxErrorKind {
    /// Byte store failure (staging, promote, discard, read)
    #[from(StorageError)]
    Storage(StorageError),
    /// Registry storage engine failure
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Caller supplied content the core refuses to register
    #[from(ContentError)]
    Content(ContentError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Clonebox error with kind discrimination.
///
/// # Examples
///
/// ```
/// use clonebox_error::{CloneboxResult, ConfigError};
///
/// fn might_fail() -> CloneboxResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Clonebox Error: {}", _0)]
pub struct CloneboxError(Box<CloneboxErrorKind>);

impl CloneboxError {
    /// Create a new error from a kind.
    pub fn new(kind: CloneboxErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CloneboxErrorKind {
        &self.0
    }

    /// True when the caller sent something unusable (4xx-equivalent).
    pub fn is_invalid_content(&self) -> bool {
        match self.kind() {
            CloneboxErrorKind::Content(e) => matches!(
                e.kind,
                ContentErrorKind::InvalidContent(_)
                    | ContentErrorKind::TooLarge { .. }
                    | ContentErrorKind::ContentTypeRejected(_)
            ),
            _ => false,
        }
    }

    /// True when the failure came from the byte store or the registry engine
    /// (5xx-equivalent, not retried automatically).
    pub fn is_io_failure(&self) -> bool {
        match self.kind() {
            CloneboxErrorKind::Storage(_) => true,
            #[cfg(feature = "database")]
            CloneboxErrorKind::Database(_) => true,
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to CloneboxErrorKind
impl<T> From<T> for CloneboxError
where
    T: Into<CloneboxErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Clonebox operations.
pub type CloneboxResult<T> = std::result::Result<T, CloneboxError>;
