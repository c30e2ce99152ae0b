use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User record as reported by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Claims only the service can write, e.g. `role`
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

impl AuthUser {
    /// Role claim from `app_metadata`, if any
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.app_metadata.get("role").and_then(Value::as_str)
    }
}

/// Authenticated session: an opaque token pair plus the user it belongs to
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Id of the signed-in user
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the access token has passed its expiry
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
