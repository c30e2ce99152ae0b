//! Application context shared by every command

use std::sync::Arc;

use studio_storage::{AuthClient, Connection, GalleryStore, ProjectStore};

use crate::admin::AdminCapability;
use crate::types::Environment;

/// The auth client and both stores, wired to one backend connection.
///
/// Built once at startup and passed by reference. Without a connection every
/// client runs unconfigured: reads come back empty and writes fail locally.
pub struct AppContext {
    /// Deployment stage
    pub environment: Environment,
    /// Session holder
    pub auth: Arc<AuthClient>,
    /// Public gallery
    pub gallery: GalleryStore,
    /// The signed-in user's projects
    pub projects: ProjectStore,
    configured: bool,
}

impl AppContext {
    /// Wires all clients to `connection`
    #[must_use]
    pub fn new(environment: Environment, connection: Option<Connection>) -> Self {
        let auth = Arc::new(AuthClient::new(
            connection.as_ref().map(|c| c.auth.clone()),
        ));
        let configured = connection.is_some();

        Self {
            environment,
            gallery: GalleryStore::new(connection.clone(), auth.clone()),
            projects: ProjectStore::new(connection, auth.clone()),
            auth,
            configured,
        }
    }

    /// Builds the context from process environment variables
    #[must_use]
    pub fn from_environment(environment: Environment) -> Self {
        let config = environment.baas_config();
        Self::new(environment, Connection::from_config(config.as_ref()))
    }

    /// Whether a backend connection is present
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.configured
    }

    /// Checks with the backend that the signed-in user is an admin
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` for non-admin users, `AuthError::NoSession`
    /// when signed out, or the backend error from the user lookup
    pub async fn require_admin(&self) -> studio_storage::AuthResult<AdminCapability> {
        AdminCapability::verify(self).await
    }
}
