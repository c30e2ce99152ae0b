//! Error types for store operations

use thiserror::Error;

use crate::rest::BackendError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during gallery and project store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backend is configured; nothing was sent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A client-side precondition failed; nothing was sent
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The backend rejected the request or could not be reached
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation needs a signed-in user
    #[error("Not signed in")]
    Unauthenticated,

    /// A returned row did not match the expected shape
    #[error("Failed to parse row: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the request never left the client
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Validation(_) | Self::Unauthenticated
        )
    }

    pub(crate) fn not_configured() -> Self {
        Self::Configuration("backend URL and API key are not configured".to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
