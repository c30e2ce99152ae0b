mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use studio::cli::CommandError;
use studio_storage::gallery::GALLERY_TABLE;
use studio_storage::project::PROJECTS_TABLE;
use studio_storage::{AuthError, StoreError};

#[tokio::test]
async fn test_gallery_list_prints_entries() {
    let app = TestApp::new();
    app.context.gallery.create(new_entry("loft")).await.unwrap();
    let mut hero = new_entry("atrium");
    hero.featured = true;
    app.context.gallery.create(hero).await.unwrap();

    let all = app.run(&["gallery", "list"]).await.unwrap();
    assert_eq!(all.as_array().map(Vec::len), Some(2));
    assert_eq!(all[0]["title"], "atrium");

    let featured = app.run(&["gallery", "list", "--featured"]).await.unwrap();
    assert_eq!(featured.as_array().map(Vec::len), Some(1));
    assert_eq!(featured[0]["room_type"], "bedroom");
}

#[tokio::test]
async fn test_gallery_delete_requires_admin() {
    let app = TestApp::new();
    let entry = app.context.gallery.create(new_entry("loft")).await.unwrap();

    let result = app
        .run_as(MEMBER_EMAIL, &["gallery", "delete", &entry.id])
        .await;
    assert!(matches!(
        result,
        Err(CommandError::Auth(AuthError::Forbidden(_)))
    ));
    assert_eq!(app.backend.rows(GALLERY_TABLE).len(), 1);

    let output = app
        .run_as(ADMIN_EMAIL, &["gallery", "delete", &entry.id])
        .await
        .unwrap();
    assert_eq!(output, json!({ "deleted": entry.id }));
    assert!(app.backend.rows(GALLERY_TABLE).is_empty());
}

#[tokio::test]
async fn test_commands_needing_a_session_ask_for_credentials() {
    let app = TestApp::new();

    let err = app.run(&["gallery", "delete", "x"]).await.unwrap_err();
    assert!(matches!(err, CommandError::Usage(_)));
    assert!(err.notice().is_none());
    assert_eq!(app.backend.auth_calls(), 0);
}

#[tokio::test]
async fn test_gallery_upload_returns_public_url() {
    let app = TestApp::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Hero.PNG");
    std::fs::write(&path, vec![0_u8; 2048]).unwrap();
    let path = path.to_string_lossy().into_owned();

    let output = app
        .run_as(ADMIN_EMAIL, &["gallery", "upload", &path, "--kind", "image"])
        .await
        .unwrap();

    let url = output["url"].as_str().unwrap();
    assert!(url.starts_with("https://storage.test/object/public/gallery-media/"));
    assert!(url.ends_with(".png"));
    assert_eq!(app.backend.object_keys().len(), 1);
}

#[tokio::test]
async fn test_gallery_upload_accepts_less_common_image_formats() {
    let app = TestApp::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.avif");
    std::fs::write(&path, vec![0_u8; 512]).unwrap();
    let path = path.to_string_lossy().into_owned();

    let output = app
        .run_as(ADMIN_EMAIL, &["gallery", "upload", &path, "--kind", "image"])
        .await
        .unwrap();

    let url = output["url"].as_str().unwrap();
    assert!(url.ends_with(".avif"));
    let key = url.rsplit('/').next().unwrap();
    let (content_type, _) = app.backend.object(TEST_BUCKET, key).unwrap();
    assert_eq!(content_type, "image/avif");
}

#[tokio::test]
async fn test_gallery_upload_rejects_wrong_kind_locally() {
    let app = TestApp::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tour.mp4");
    std::fs::write(&path, b"not really a video").unwrap();
    let path = path.to_string_lossy().into_owned();

    let err = app
        .run_as(ADMIN_EMAIL, &["gallery", "upload", &path, "--kind", "image"])
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::Store(StoreError::Validation(_))));
    assert_eq!(err.notice().map(|n| n.code), Some("invalid_input"));
    assert_eq!(app.backend.storage_calls(), 0);
}

#[tokio::test]
async fn test_projects_migrate_reports_skipped_records() {
    let app = TestApp::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.json");
    std::fs::write(
        &path,
        json!([
            { "name": "Kitchen", "visualizationRequests": ["warmer light"] },
            { "description": "missing a name" },
            { "name": "Study" }
        ])
        .to_string(),
    )
    .unwrap();
    let path = path.to_string_lossy().into_owned();

    let output = app
        .run_as(MEMBER_EMAIL, &["projects", "migrate", &path])
        .await
        .unwrap();
    assert_eq!(output["migrated"], 2);
    assert_eq!(output["skipped"], 1);
    assert_eq!(app.backend.rows(PROJECTS_TABLE).len(), 2);

    let listed = app
        .run_as(MEMBER_EMAIL, &["projects", "list"])
        .await
        .unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_projects_migrate_missing_file() {
    let app = TestApp::new();

    let err = app
        .run_as(MEMBER_EMAIL, &["projects", "migrate", "/nonexistent/projects.json"])
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Io { .. }));
}

#[tokio::test]
async fn test_auth_exchange_bad_link_gives_notice() {
    let app = TestApp::new();

    let err = app
        .run(&["auth", "exchange", "https://studio.test/auth/callback"])
        .await
        .unwrap_err();
    assert_eq!(err.notice().map(|n| n.code), Some("invalid_link"));
}

#[tokio::test]
async fn test_auth_sign_in_prints_server_user() {
    let app = TestApp::new();

    let output = app.run_as(ADMIN_EMAIL, &["auth", "sign-in"]).await.unwrap();
    assert_eq!(output["email"], ADMIN_EMAIL);
    assert_eq!(output["app_metadata"]["role"], "admin");

    let err = app
        .run(&[
            "auth",
            "sign-in",
            "--email",
            ADMIN_EMAIL,
            "--password",
            "wrong",
        ])
        .await
        .unwrap_err();
    assert_eq!(err.notice().map(|n| n.code), Some("auth_rejected"));
}
