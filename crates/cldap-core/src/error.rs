//! Error types for cldap operations.
//!
//! A single error enum covers configuration handling and directory access so that every
//! command can report failures the same way. Each variant carries a stable error code.

use thiserror::Error;

/// Main error type for cldap operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The canonical configuration file is absent or unreadable
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// The configuration file exists but could not be decoded
    #[error("Failed to decode configuration: {0}")]
    ConfigDecode(String),

    /// One or more mandatory configuration fields are empty
    #[error("Following fields are mandatory: {}", fields.join(", "))]
    Validation {
        /// YAML key of every empty mandatory field, in declaration order
        fields: Vec<String>,
    },

    /// Dialing the directory or establishing TLS failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The directory rejected a bind
    #[error("Bind failed: {0}")]
    Bind(String),

    /// A search that requires a match returned no entries
    #[error("Not found: {0}")]
    NotFound(String),

    /// A search that requires exactly one match returned several entries
    #[error("Too many matches found: {count} entries match {filter}")]
    AmbiguousMatch {
        /// Filter that was sent to the directory
        filter: String,
        /// Number of entries returned
        count: usize,
    },

    /// Any other failure reported by the directory
    #[error("Directory error during {operation}: {message}")]
    Directory {
        /// Operation that failed (search, unbind, ...)
        operation: String,
        /// Error message
        message: String,
    },

    /// A directory operation did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Reading or writing local files failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Specialized result type for cldap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "CONFIG_MISSING",
            Self::ConfigDecode(_) => "CONFIG_DECODE",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Bind(_) => "BIND_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AmbiguousMatch { .. } => "AMBIGUOUS_MATCH",
            Self::Directory { .. } => "DIRECTORY_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Builds a [`Error::Directory`] for the given operation.
    #[must_use]
    pub fn directory(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Directory {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

// Conversions from external error types
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigDecode(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Connection(format!("invalid directory address: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation {
            fields: crate::config::missing_fields(&err),
        }
    }
}
