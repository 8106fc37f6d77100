//! Cleanup failures that do not fail the request.

/// A staged blob that could not be removed after its upload turned out to be a
/// duplicate.
///
/// The upload itself succeeded (the caller gets the canonical record back), so
/// this travels alongside the result instead of replacing it. The staging
/// sweep reclaims the blob later.
///
/// # Examples
///
/// ```
/// use clonebox_error::{ResourceLeak, StorageError, StorageErrorKind};
///
/// let cause = StorageError::new(StorageErrorKind::Discard("permission denied".into()));
/// let leak = ResourceLeak::new("9b2e", &cause);
/// assert_eq!(leak.handle, "9b2e");
/// assert!(leak.to_string().contains("permission denied"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("Leaked staged blob {}: {}", handle, reason)]
pub struct ResourceLeak {
    /// Storage handle of the blob left behind
    pub handle: String,
    /// Rendered cause of the failed cleanup
    pub reason: String,
}

impl ResourceLeak {
    /// Record a leaked blob and the error that prevented its removal.
    pub fn new(handle: impl Into<String>, cause: &dyn std::fmt::Display) -> Self {
        Self {
            handle: handle.into(),
            reason: cause.to_string(),
        }
    }
}
