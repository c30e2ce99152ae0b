mod common;

use common::*;
use pretty_assertions::assert_eq;
use studio_storage::AuthError;

#[tokio::test]
async fn test_sign_in_sets_session_and_notifies() {
    let ctx = TestContext::new();
    let user_id = ctx.backend.register_user("ada@studio.test", TEST_PASSWORD, None);
    let mut subscription = ctx.auth.subscribe();
    assert!(subscription.current().is_none());

    let session = ctx.auth.sign_in("ada@studio.test", TEST_PASSWORD).await.unwrap();
    assert_eq!(session.user_id(), user_id);

    let notified = subscription.changed().await.unwrap();
    assert_eq!(notified.map(|s| s.user.id), Some(user_id.clone()));
    assert_eq!(
        ctx.auth.current_session().map(|s| s.user.id),
        Some(user_id)
    );
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let ctx = TestContext::new();
    ctx.backend.register_user("ada@studio.test", TEST_PASSWORD, None);

    let result = ctx.auth.sign_in("ada@studio.test", "wrong").await;
    assert!(matches!(result, Err(AuthError::Rejected(_))));
    assert!(ctx.auth.current_session().is_none());

    let result = ctx.auth.sign_in("nobody@studio.test", TEST_PASSWORD).await;
    assert!(matches!(result, Err(AuthError::Rejected(_))));
}

#[tokio::test]
async fn test_transport_failure_is_backend_error() {
    let ctx = TestContext::new();
    ctx.backend.set_offline(true);

    let result = ctx.auth.sign_in("ada@studio.test", TEST_PASSWORD).await;
    assert!(matches!(result, Err(AuthError::Backend(_))));
}

#[tokio::test]
async fn test_sign_up_does_not_establish_session() {
    let ctx = TestContext::new();

    let user = ctx.auth.sign_up("new@studio.test", TEST_PASSWORD).await.unwrap();
    assert_eq!(user.email.as_deref(), Some("new@studio.test"));
    assert!(ctx.auth.current_session().is_none());

    // Unconfirmed accounts cannot sign in yet
    assert!(matches!(
        ctx.auth.sign_in("new@studio.test", TEST_PASSWORD).await,
        Err(AuthError::Rejected(_))
    ));

    ctx.backend.confirm_user("new@studio.test");
    ctx.auth.sign_in("new@studio.test", TEST_PASSWORD).await.unwrap();
    assert!(ctx.auth.current_session().is_some());
}

#[tokio::test]
async fn test_sign_out_clears_session_even_when_remote_fails() {
    let ctx = TestContext::new();
    ctx.sign_in("ada@studio.test").await;
    ctx.backend.fail_sign_out(true);

    ctx.auth.sign_out().await;
    assert!(ctx.auth.current_session().is_none());
    assert_eq!(ctx.auth.access_token(), None);
}

#[tokio::test]
async fn test_sign_out_revokes_remote_token() {
    let ctx = TestContext::new();
    ctx.sign_in("ada@studio.test").await;
    let token = ctx.auth.access_token().unwrap();

    ctx.auth.sign_out().await;
    assert!(!ctx.backend.is_token_live(&token));
}

#[tokio::test]
async fn test_exchange_code_is_single_use() {
    let ctx = TestContext::new();
    let user_id = ctx.backend.register_user("ada@studio.test", TEST_PASSWORD, None);
    let code = ctx.backend.issue_code("ada@studio.test");
    let redirect = format!("https://studio.test/auth/callback?code={code}");

    let session = ctx.auth.exchange_code_for_session(&redirect).await.unwrap();
    assert_eq!(session.user_id(), user_id);

    let calls = ctx.backend.auth_calls();
    assert!(matches!(
        ctx.auth.exchange_code_for_session(&redirect).await,
        Err(AuthError::CodeAlreadyUsed)
    ));
    assert_eq!(ctx.backend.auth_calls(), calls);
}

#[tokio::test]
async fn test_exchange_code_error_redirects() {
    let ctx = TestContext::new();

    assert!(matches!(
        ctx.auth
            .exchange_code_for_session("https://studio.test/auth/callback")
            .await,
        Err(AuthError::InvalidRedirect(_))
    ));
    assert!(matches!(
        ctx.auth
            .exchange_code_for_session(
                "https://studio.test/auth/callback?error=access_denied&error_description=Email+link+is+invalid"
            )
            .await,
        Err(AuthError::Rejected(message)) if message == "Email link is invalid"
    ));
    assert!(matches!(
        ctx.auth
            .exchange_code_for_session("https://studio.test/auth/callback?code=unknown")
            .await,
        Err(AuthError::Rejected(_))
    ));
    assert_eq!(ctx.auth.current_session(), None);
}

#[tokio::test]
async fn test_authorize_url_verifier_is_sent_on_exchange() {
    let ctx = TestContext::new();
    ctx.backend.register_user("ada@studio.test", TEST_PASSWORD, None);

    let url = ctx
        .auth
        .authorize_url("google", "https://studio.test/auth/callback")
        .unwrap();
    assert!(url.contains("code_challenge="));

    let code = ctx.backend.issue_code("ada@studio.test");
    ctx.auth
        .exchange_code_for_session(&format!("https://studio.test/auth/callback?code={code}"))
        .await
        .unwrap();

    let verifier = ctx.backend.last_code_verifier().unwrap();
    assert_eq!(verifier.len(), 64);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let ctx = TestContext::new();
    ctx.sign_in("ada@studio.test").await;
    let before = ctx.auth.current_session().unwrap();

    let after = ctx.auth.refresh_session().await.unwrap();
    assert_ne!(after.access_token, before.access_token);
    assert_eq!(after.user.id, before.user.id);

    ctx.auth.sign_out().await;
    assert!(matches!(
        ctx.auth.refresh_session().await,
        Err(AuthError::NoSession)
    ));
}

#[tokio::test]
async fn test_subscriptions_are_released_exactly_once() {
    let ctx = TestContext::new();
    assert_eq!(ctx.auth.listener_count(), 0);

    let first = ctx.auth.subscribe();
    let second = ctx.auth.subscribe();
    assert_eq!(ctx.auth.listener_count(), 2);

    first.unsubscribe();
    assert_eq!(ctx.auth.listener_count(), 1);
    drop(second);
    assert_eq!(ctx.auth.listener_count(), 0);
}

#[tokio::test]
async fn test_final_sign_out_reaches_subscribers_after_client_is_dropped() {
    let ctx = TestContext::new();
    ctx.sign_in("ada@studio.test").await;
    let mut subscription = ctx.auth.subscribe();

    ctx.auth.sign_out().await;
    drop(ctx);

    assert_eq!(subscription.changed().await, Some(None));
    assert_eq!(subscription.changed().await, None);
}

#[tokio::test]
async fn test_fetch_user_reports_server_role() {
    let ctx = TestContext::new();
    ctx.backend
        .register_user("admin@studio.test", TEST_PASSWORD, Some("admin"));
    ctx.auth
        .sign_in("admin@studio.test", TEST_PASSWORD)
        .await
        .unwrap();

    let user = ctx.auth.fetch_user().await.unwrap();
    assert_eq!(user.role(), Some("admin"));
}
