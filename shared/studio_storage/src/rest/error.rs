//! Error types for calls to the hosted backend

use thiserror::Error;

/// Result type for wire-level operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors returned by the hosted backend or the transport in front of it
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The service answered with a non-success status
    #[error("Backend rejected the request ({status}): {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// The request never got a response
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not have the expected shape
    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether the service answered 5xx or could not be reached
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::Network(_) => true,
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for BackendError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(err) => Self::from(err),
            reqwest_middleware::Error::Middleware(err) => Self::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}
