//! Error types for sentiview-client

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Result type alias for sentiview-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// A failed HTTP exchange.
///
/// `status` is `None` when no response arrived (connection refused,
/// timeout). `data` carries the response body when there was one.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    /// Human-readable message.
    pub message: String,
    /// Response status.
    pub status: Option<u16>,
    /// Response body.
    pub data: Option<Value>,
}

impl HttpError {
    /// Error for a non-success response.
    pub fn status(status: u16, data: Option<Value>) -> Self {
        Self {
            message: format!("Request failed with status code {status}"),
            status: Some(status),
            data,
        }
    }

    /// Error for a request that got no response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
        }
    }

    /// Transport failures, server errors and rate limiting are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => status == 429 || (500..600).contains(&status),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Errors that can occur in sentiview-client
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from sentiview-core
    #[error("Core error: {0}")]
    Core(#[from] sentiview_core::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// A response body that does not match the expected payload
    #[error("Unexpected payload from {url}: {source}")]
    Decode {
        /// Request path
        url: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Client configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// Input validation error
    #[error("Validation error: {message}")]
    Validation {
        /// What went wrong
        message: String,
    },

    /// An error shared between callers of one cached request
    #[error(transparent)]
    Shared(Arc<Error>),

    /// The upload endpoint rejected the data
    #[error("Upload rejected: {detail}")]
    UploadRejected {
        /// Backend explanation
        detail: String,
    },
}

impl Error {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Creates a decode error for `url`.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Decode {
            url: url.into(),
            source,
        }
    }

    /// Takes ownership of a shared error when this is the last handle.
    pub fn from_shared(error: Arc<Error>) -> Self {
        Arc::try_unwrap(error).unwrap_or_else(Error::Shared)
    }

    /// Returns whether retrying the request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_retryable(),
            Error::Core(e) => e.is_retryable(),
            Error::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// The HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(e) => e.status,
            Error::Shared(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = HttpError::status(404, None);
        assert_eq!(err.to_string(), "Request failed with status code 404");
        assert_eq!(Error::from(err).status(), Some(404));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HttpError::transport("connection refused").is_retryable());
        assert!(HttpError::status(503, None).is_retryable());
        assert!(HttpError::status(429, None).is_retryable());
        assert!(!HttpError::status(422, None).is_retryable());
        assert!(!Error::validation("bad").is_retryable());
    }

    #[test]
    fn test_decode_error_names_url() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = Error::decode("/metrics/average_mark", source);
        assert!(err.to_string().contains("/metrics/average_mark"));
    }

    #[test]
    fn test_from_shared() {
        let shared = Arc::new(Error::from(HttpError::status(502, None)));
        let other = Arc::clone(&shared);
        let err = Error::from_shared(shared);
        assert!(matches!(err, Error::Shared(_)));
        assert_eq!(err.status(), Some(502));
        assert!(err.is_retryable());

        drop(err);
        assert!(matches!(Error::from_shared(other), Error::Http(_)));
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
