//! Error types for auth operations

use thiserror::Error;

use crate::rest::BackendError;

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Credential and session failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// No backend is configured
    #[error("Authentication is not configured")]
    NotConfigured,

    /// The service refused the credentials, code or token
    #[error("{0}")]
    Rejected(String),

    /// The redirect URL carried no usable code
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    /// The one-time code was already spent
    #[error("This sign-in link has already been used")]
    CodeAlreadyUsed,

    /// The operation needs a session and there is none
    #[error("Not signed in")]
    NoSession,

    /// Signed in, but without the required capability
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// The service could not be reached or answered 5xx
    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Http { status, message } if status < 500 => Self::Rejected(message),
            other => Self::Backend(other),
        }
    }
}
