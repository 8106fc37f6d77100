//! Content validation error types.

/// Reasons the core refuses a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ContentErrorKind {
    /// Submitted content is malformed (not an absolute URL, empty input)
    #[display("Invalid content: {}", _0)]
    InvalidContent(String),
    /// Upload exceeded the configured size ceiling
    #[display("Upload exceeds {} byte limit", limit)]
    TooLarge {
        /// Configured ceiling in bytes
        limit: u64,
    },
    /// Caller-side content-type check rejected the payload
    #[display("Content type rejected: {}", _0)]
    ContentTypeRejected(String),
    /// Identifier retry loop hit its configured cap
    #[display("No free identifier after {} attempts", _0)]
    RetriesExhausted(u32),
}

/// Content error with location tracking.
///
/// # Examples
///
/// ```
/// use clonebox_error::{ContentError, ContentErrorKind};
///
/// let err = ContentError::new(ContentErrorKind::InvalidContent("missing host".into()));
/// assert!(format!("{}", err).contains("missing host"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Content Error: {} at line {} in {}", kind, line, file)]
pub struct ContentError {
    /// The kind of error that occurred
    pub kind: ContentErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ContentError {
    /// Create a new content error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ContentErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
