mod common;

use common::*;
use studio_storage::media::{MAX_IMAGE_BYTES, MAX_VIDEO_BYTES};
use studio_storage::{MediaFile, MediaKind, StoreError};

#[tokio::test]
async fn test_upload_video_returns_public_url() {
    let ctx = TestContext::new();

    let url = ctx
        .gallery
        .upload_media(
            MediaFile::new("walkthrough.mp4", "video/mp4", vec![1, 2, 3]),
            MediaKind::Video,
        )
        .await
        .unwrap();

    assert!(url.starts_with("https://storage.test/object/public/gallery-media/"));
    assert!(url.ends_with(".mp4"));

    let key = url.rsplit('/').next().unwrap();
    let (content_type, bytes) = ctx.backend.object(TEST_BUCKET, key).unwrap();
    assert_eq!(content_type, "video/mp4");
    assert_eq!(bytes, vec![1, 2, 3]);
    assert_eq!(ctx.backend.storage_calls(), 1);
}

#[tokio::test]
async fn test_oversized_video_never_reaches_the_network() {
    let ctx = TestContext::new();

    let result = ctx
        .gallery
        .upload_media(
            MediaFile::new("huge.mp4", "video/mp4", vec![0; MAX_VIDEO_BYTES + 1]),
            MediaKind::Video,
        )
        .await;

    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert_eq!(ctx.backend.storage_calls(), 0);
    assert!(ctx.backend.object_keys().is_empty());
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let ctx = TestContext::new();

    let result = ctx
        .gallery
        .upload_media(
            MediaFile::new("huge.png", "image/png", vec![0; MAX_IMAGE_BYTES + 1]),
            MediaKind::Image,
        )
        .await;

    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert_eq!(ctx.backend.storage_calls(), 0);
}

#[tokio::test]
async fn test_image_with_wrong_mime_is_rejected() {
    let ctx = TestContext::new();

    for content_type in ["video/mp4", "application/octet-stream", "text/plain"] {
        let result = ctx
            .gallery
            .upload_media(
                MediaFile::new("render.png", content_type, vec![0; 16]),
                MediaKind::Image,
            )
            .await;
        assert!(
            matches!(result, Err(StoreError::Validation(_))),
            "accepted {content_type}"
        );
    }
    assert_eq!(ctx.backend.storage_calls(), 0);
}

#[tokio::test]
async fn test_validation_runs_before_configuration_check() {
    let ctx = TestContext::unconfigured();

    let invalid = ctx
        .gallery
        .upload_media(
            MediaFile::new("notes.txt", "text/plain", vec![0; 4]),
            MediaKind::Image,
        )
        .await;
    assert!(matches!(invalid, Err(StoreError::Validation(_))));

    let valid = ctx
        .gallery
        .upload_media(
            MediaFile::new("render.png", "image/png", vec![0; 4]),
            MediaKind::Image,
        )
        .await;
    assert!(matches!(valid, Err(StoreError::Configuration(_))));
    assert_eq!(ctx.backend.storage_calls(), 0);
}

#[tokio::test]
async fn test_dropped_connection_is_a_single_failure() {
    let ctx = TestContext::new();
    ctx.backend.set_offline(true);

    let result = ctx
        .gallery
        .upload_media(
            MediaFile::new("render.png", "image/png", vec![0; 4]),
            MediaKind::Image,
        )
        .await;

    assert!(matches!(result, Err(StoreError::Backend(_))));
    assert_eq!(ctx.backend.storage_calls(), 1);
}
