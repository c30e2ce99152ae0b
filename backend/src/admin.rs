//! Admin capability, granted by the backend rather than a local flag

use studio_storage::{AuthError, AuthResult};

use crate::state::AppContext;

/// Role that `app_metadata.role` must carry for gallery administration
pub const ADMIN_ROLE: &str = "admin";

/// Proof that the backend confirmed the current user as an admin.
///
/// Only obtainable through [`AdminCapability::verify`]; gallery writes in the
/// CLI take one as an argument.
#[derive(Debug, Clone)]
pub struct AdminCapability {
    user_id: String,
}

impl AdminCapability {
    /// Asks the backend who the current user is and checks their role
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when the user is not an admin, and
    /// propagates lookup failures such as `AuthError::NoSession`
    pub async fn verify(context: &AppContext) -> AuthResult<Self> {
        let user = context.auth.fetch_user().await?;

        if user.role() == Some(ADMIN_ROLE) {
            tracing::info!("admin capability granted to {}", user.id);
            Ok(Self { user_id: user.id })
        } else {
            tracing::warn!("user {} requested admin access without the role", user.id);
            Err(AuthError::Forbidden(format!(
                "user {} is not an administrator",
                user.id
            )))
        }
    }

    /// The verified admin's user id
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
