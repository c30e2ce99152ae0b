//! User-facing notices for failed operations

use std::fmt;

use serde::Serialize;
use studio_storage::rest::BackendError;
use studio_storage::{AuthError, StoreError};

/// Transient notification shown after a failed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotice {
    /// Whether trying the same action again may succeed
    pub allow_retry: bool,
    /// Machine-readable notice code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

impl UserNotice {
    /// Create a new notice
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>, retry: bool) -> Self {
        Self {
            allow_retry: retry,
            code,
            message: message.into(),
        }
    }

    fn backend(err: &BackendError) -> Self {
        if err.is_upstream() {
            tracing::error!("Backend unavailable: {err}");
            Self::new(
                "backend_unavailable",
                "The studio service is temporarily unavailable",
                true,
            )
        } else {
            tracing::warn!("Backend rejected request: {err}");
            match err {
                BackendError::Http { message, .. } => Self::new("rejected", message.clone(), false),
                _ => Self::new("internal_error", "Unexpected response from the service", false),
            }
        }
    }
}

impl fmt::Display for UserNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&StoreError> for UserNotice {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Configuration(msg) => {
                tracing::warn!("Store not configured: {msg}");
                Self::new("not_configured", "The studio backend is not configured", false)
            }
            StoreError::Validation(msg) => {
                tracing::warn!("Invalid input: {msg}");
                Self::new("invalid_input", msg.clone(), false)
            }
            StoreError::NotFound(what) => {
                tracing::warn!("Not found: {what}");
                Self::new("not_found", format!("{what} no longer exists"), false)
            }
            StoreError::Unauthenticated => {
                tracing::warn!("Operation attempted while signed out");
                Self::new("unauthenticated", "Please sign in first", false)
            }
            StoreError::Serialization(msg) => {
                tracing::error!("Malformed row: {msg}");
                Self::new("internal_error", "Unexpected response from the service", false)
            }
            StoreError::Backend(err) => Self::backend(err),
        }
    }
}

impl From<StoreError> for UserNotice {
    fn from(err: StoreError) -> Self {
        Self::from(&err)
    }
}

impl From<&AuthError> for UserNotice {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::NotConfigured => {
                tracing::warn!("Auth not configured");
                Self::new("not_configured", "Sign-in is not available", false)
            }
            AuthError::Rejected(msg) => {
                tracing::warn!("Auth rejected: {msg}");
                Self::new("auth_rejected", msg.clone(), false)
            }
            AuthError::InvalidRedirect(msg) => {
                tracing::warn!("Invalid redirect: {msg}");
                Self::new("invalid_link", "This sign-in link is not valid", false)
            }
            AuthError::CodeAlreadyUsed => {
                tracing::warn!("Sign-in code reused");
                Self::new("link_used", err.to_string(), false)
            }
            AuthError::NoSession => {
                tracing::warn!("Operation attempted while signed out");
                Self::new("unauthenticated", "Please sign in first", false)
            }
            AuthError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {msg}");
                Self::new("forbidden", "You do not have access to this action", false)
            }
            AuthError::Backend(err) => Self::backend(err),
        }
    }
}

impl From<AuthError> for UserNotice {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}
