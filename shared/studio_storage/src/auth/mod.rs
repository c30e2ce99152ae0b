//! Session-based authentication and session-change notification
mod error;
mod pkce;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use common_types::{AuthUser, Session};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use error::{AuthError, AuthResult};
pub use pkce::PkcePair;

use crate::rest::AuthApi;

/// Live view of the session; dropping it (or calling
/// [`SessionSubscription::unsubscribe`]) releases the listener.
pub struct SessionSubscription {
    receiver: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    /// Session as of the last observed change
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next sign in, sign out or refresh.
    ///
    /// Returns `None` once the auth client is gone.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Releases the listener
    pub fn unsubscribe(self) {}
}

/// Auth client holding the process's single session
pub struct AuthClient {
    api: Option<Arc<dyn AuthApi>>,
    session: watch::Sender<Option<Session>>,
    spent_codes: Mutex<HashSet<String>>,
    pending_verifier: Mutex<Option<String>>,
}

impl AuthClient {
    /// Creates a signed-out client; `None` means no backend is configured
    #[must_use]
    pub fn new(api: Option<Arc<dyn AuthApi>>) -> Self {
        Self::restore(api, None)
    }

    /// Creates a client starting from a session read at startup
    #[must_use]
    pub fn restore(api: Option<Arc<dyn AuthApi>>, session: Option<Session>) -> Self {
        let (session, _) = watch::channel(session);
        Self {
            api,
            session,
            spent_codes: Mutex::new(HashSet::new()),
            pending_verifier: Mutex::new(None),
        }
    }

    /// Whether a backend is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    /// The current session, if signed in
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Access token of the current session
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    /// Id of the signed-in user
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.user.id.clone())
    }

    /// Subscribes to session changes
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.session.subscribe(),
        }
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.session.receiver_count()
    }

    fn api(&self) -> AuthResult<&Arc<dyn AuthApi>> {
        self.api.as_ref().ok_or(AuthError::NotConfigured)
    }

    fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }

    /// Signs in with email and password
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` without a backend,
    /// `AuthError::Rejected` for bad credentials or an unconfirmed account,
    /// `AuthError::Backend` for transport failures
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = self.api()?.sign_in_with_password(email, password).await?;
        info!("signed in as {}", session.user.id);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Registers an account. The account must be confirmed before sign in
    /// succeeds, so no session is established here.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` without a backend, otherwise the
    /// service's rejection
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let user = self.api()?.sign_up(email, password).await?;
        info!("registered account {}", user.id);
        Ok(user)
    }

    /// Signs out. Local state is cleared even when the remote call fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let previous = self.session.send_replace(None);
        self.pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let (Some(session), Some(api)) = (previous, self.api.as_ref()) else {
            return;
        };
        if let Err(e) = api.sign_out(&session.access_token).await {
            warn!("remote sign out failed, local session cleared anyway: {e}");
        }
    }

    /// Starts an external identity hand-off and returns the URL to visit.
    ///
    /// The PKCE verifier is kept until the redirect comes back.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` without a backend
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> AuthResult<String> {
        let api = self.api()?;
        let pair = PkcePair::generate();
        let url = api.authorize_url(provider, redirect_to, &pair.challenge);
        *self
            .pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pair.verifier);
        Ok(url)
    }

    /// Establishes a session from the one-time code in a redirect URL.
    ///
    /// A code is spent on its first attempt, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRedirect` when the URL has no code,
    /// `AuthError::Rejected` when the redirect carries an error or the
    /// service refuses the code, `AuthError::CodeAlreadyUsed` on reuse
    #[instrument(skip(self, redirect_url))]
    pub async fn exchange_code_for_session(&self, redirect_url: &str) -> AuthResult<Session> {
        let api = self.api()?;
        let params = redirect_params(redirect_url)?;

        if let Some(description) = params
            .get("error_description")
            .or_else(|| params.get("error"))
        {
            return Err(AuthError::Rejected(description.clone()));
        }

        let code = params
            .get("code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthError::InvalidRedirect("no code in redirect URL".to_string()))?;

        let first_use = self
            .spent_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code.clone());
        if !first_use {
            debug!("refusing to reuse a spent sign-in code");
            return Err(AuthError::CodeAlreadyUsed);
        }

        let verifier = self
            .pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let session = api.exchange_code(code, verifier.as_deref()).await?;
        info!("signed in as {} from redirect", session.user.id);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Replaces the session with a fresh one from its refresh token
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoSession` when signed out, otherwise the
    /// service's rejection. A rejected refresh signs the client out.
    pub async fn refresh_session(&self) -> AuthResult<Session> {
        let api = self.api()?;
        let refresh_token = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.refresh_token.clone())
            .ok_or(AuthError::NoSession)?;

        match api.refresh(&refresh_token).await.map_err(AuthError::from) {
            Ok(session) => {
                self.set_session(Some(session.clone()));
                Ok(session)
            }
            Err(AuthError::Rejected(message)) => {
                warn!("refresh token rejected, signing out: {message}");
                self.set_session(None);
                Err(AuthError::Rejected(message))
            }
            Err(e) => Err(e),
        }
    }

    /// The service's view of the signed-in user, including server-held claims
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoSession` when signed out, otherwise the
    /// service's rejection
    pub async fn fetch_user(&self) -> AuthResult<AuthUser> {
        let api = self.api()?;
        let access_token = self.access_token().ok_or(AuthError::NoSession)?;
        Ok(api.user(&access_token).await?)
    }
}

/// Query parameters of a redirect URL, falling back to the fragment
fn redirect_params(redirect_url: &str) -> AuthResult<HashMap<String, String>> {
    let url = Url::parse(redirect_url).map_err(|e| AuthError::InvalidRedirect(e.to_string()))?;

    let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if params.is_empty() {
        if let Some(fragment) = url.fragment() {
            params = url::form_urlencoded::parse(fragment.as_bytes())
                .into_owned()
                .collect();
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_params_read_query_then_fragment() {
        let params = redirect_params("https://studio.example/auth/callback?code=abc").unwrap();
        assert_eq!(params.get("code").map(String::as_str), Some("abc"));

        let params =
            redirect_params("https://studio.example/auth/callback#error=access_denied").unwrap();
        assert_eq!(params.get("error").map(String::as_str), Some("access_denied"));

        assert!(matches!(
            redirect_params("not a url"),
            Err(AuthError::InvalidRedirect(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_client_reports_not_configured() {
        let client = AuthClient::new(None);
        assert!(matches!(
            client.sign_in("a@example.com", "pw").await,
            Err(AuthError::NotConfigured)
        ));
        assert!(client.current_session().is_none());
        client.sign_out().await;
        assert!(client.current_session().is_none());
    }
}
