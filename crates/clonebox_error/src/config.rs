//! Configuration error types.

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Dotted configuration key the error refers to, when known
    pub key: Option<String>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use clonebox_error::ConfigError;
    ///
    /// let err = ConfigError::new("Failed to build configuration");
    /// assert!(err.key.is_none());
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            key: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Create an error about a specific configuration key.
    ///
    /// ```
    /// use clonebox_error::ConfigError;
    ///
    /// let err = ConfigError::for_key("links.identifier_bytes", "must be between 1 and 32");
    /// assert_eq!(err.key.as_deref(), Some("links.identifier_bytes"));
    /// assert!(err.message.contains("links.identifier_bytes"));
    /// ```
    #[track_caller]
    pub fn for_key(key: impl Into<String>, message: impl AsRef<str>) -> Self {
        let key = key.into();
        let location = std::panic::Location::caller();
        Self {
            message: format!("{}: {}", key, message.as_ref()),
            key: Some(key),
            line: location.line(),
            file: location.file(),
        }
    }
}
