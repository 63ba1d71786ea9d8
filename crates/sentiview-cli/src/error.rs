//! Error types for sentiview-cli

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sentiview-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sentiview-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from sentiview-core
    #[error("Core error: {0}")]
    Core(#[from] sentiview_core::Error),

    /// Error from sentiview-client
    #[error("Client error: {0}")]
    Client(#[from] sentiview_client::Error),

    /// Unreadable input file
    #[error("Cannot read {path}: {source}")]
    Input {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Input that is not JSON
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Output that failed to serialize
    #[error("Cannot render output: {0}")]
    Render(#[from] serde_json::Error),

    /// Bad command-line usage
    #[error("{0}")]
    Usage(String),
}

impl Error {
    /// Create a usage error.
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Error::Usage(message.into())
    }
}
