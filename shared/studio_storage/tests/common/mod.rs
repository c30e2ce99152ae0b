#![allow(dead_code)]

use std::sync::Arc;

use common_types::{DesignStyle, NewGalleryEntry, RoomType};
use studio_storage::rest::mock::InMemoryBackend;
use studio_storage::{AuthClient, GalleryStore, ProjectStore};

pub const TEST_BUCKET: &str = "gallery-media";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Clients wired to one in-memory backend
pub struct TestContext {
    pub backend: Arc<InMemoryBackend>,
    pub auth: Arc<AuthClient>,
    pub gallery: GalleryStore,
    pub projects: ProjectStore,
}

impl TestContext {
    pub fn new() -> Self {
        let backend = InMemoryBackend::new();
        let connection = backend.connection(TEST_BUCKET);
        let auth = Arc::new(AuthClient::new(Some(connection.auth.clone())));

        Self {
            gallery: GalleryStore::new(Some(connection.clone()), auth.clone()),
            projects: ProjectStore::new(Some(connection), auth.clone()),
            auth,
            backend,
        }
    }

    /// Clients with no backend configured; the backend is still returned so
    /// tests can assert nothing reached it
    pub fn unconfigured() -> Self {
        let auth = Arc::new(AuthClient::new(None));
        Self {
            backend: InMemoryBackend::new(),
            gallery: GalleryStore::new(None, auth.clone()),
            projects: ProjectStore::new(None, auth.clone()),
            auth,
        }
    }

    /// Registers `email` and signs in, returning the user id
    pub async fn sign_in(&self, email: &str) -> String {
        let user_id = self.backend.register_user(email, TEST_PASSWORD, None);
        self.auth
            .sign_in(email, TEST_PASSWORD)
            .await
            .expect("Failed to sign in test user");
        user_id
    }
}

pub fn new_entry(title: &str) -> NewGalleryEntry {
    NewGalleryEntry {
        title: title.to_string(),
        description: format!("{title} walkthrough"),
        room_type: RoomType::LivingRoom,
        style: DesignStyle::Scandinavian,
        video_url: format!("https://cdn.test/{title}.mp4"),
        thumbnail_url: format!("https://cdn.test/{title}.jpg"),
        featured: false,
    }
}
