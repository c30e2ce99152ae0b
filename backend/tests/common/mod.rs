// Not every helper is used in every test
#![allow(dead_code)]

use std::sync::Arc;

use clap::Parser;
use common_types::{DesignStyle, NewGalleryEntry, RoomType};
use studio::{
    cli::{Cli, CommandError},
    state::AppContext,
    types::Environment,
};
use studio_storage::rest::mock::InMemoryBackend;

pub const TEST_BUCKET: &str = "gallery-media";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const ADMIN_EMAIL: &str = "admin@studio.test";
pub const MEMBER_EMAIL: &str = "member@studio.test";

/// An application context over an in-memory backend with one admin and one
/// regular member registered
pub struct TestApp {
    pub backend: Arc<InMemoryBackend>,
    pub context: AppContext,
}

impl TestApp {
    pub fn new() -> Self {
        let backend = InMemoryBackend::new();
        backend.register_user(ADMIN_EMAIL, TEST_PASSWORD, Some("admin"));
        backend.register_user(MEMBER_EMAIL, TEST_PASSWORD, None);

        let context = AppContext::new(
            Environment::Development,
            Some(backend.connection(TEST_BUCKET)),
        );
        Self { backend, context }
    }

    pub async fn sign_in(&self, email: &str) {
        self.context
            .auth
            .sign_in(email, TEST_PASSWORD)
            .await
            .expect("Failed to sign in test user");
    }

    /// Parses `args` as a command line and runs it
    pub async fn run(&self, args: &[&str]) -> Result<serde_json::Value, CommandError> {
        let cli = Cli::try_parse_from(std::iter::once("studio").chain(args.iter().copied()))
            .expect("Invalid test command line");
        cli.run(&self.context).await
    }

    /// Runs `args` with credentials for `email`
    pub async fn run_as(
        &self,
        email: &str,
        args: &[&str],
    ) -> Result<serde_json::Value, CommandError> {
        let mut full = args.to_vec();
        full.extend(["--email", email, "--password", TEST_PASSWORD]);
        self.run(&full).await
    }
}

pub fn new_entry(title: &str) -> NewGalleryEntry {
    NewGalleryEntry {
        title: title.to_string(),
        description: format!("{title} walkthrough"),
        room_type: RoomType::Bedroom,
        style: DesignStyle::Minimalist,
        video_url: format!("https://cdn.test/{title}.mp4"),
        thumbnail_url: format!("https://cdn.test/{title}.jpg"),
        featured: false,
    }
}
