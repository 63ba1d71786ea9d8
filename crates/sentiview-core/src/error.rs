//! Error types for Sentiview core.

use std::path::PathBuf;

/// Errors raised while managing filter state, persistence and configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Input validation error
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// A date or timestamp that could not be parsed
    #[error("Invalid date '{value}'")]
    InvalidDate {
        /// The offending input
        value: String,
    },
}

/// Convenience `Result` type alias for Sentiview core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether retrying the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates an invalid-date error.
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Error::InvalidDate {
            value: value.into(),
        }
    }
}
