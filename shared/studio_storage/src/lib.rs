//! Data access for the interior-design studio
//!
//! This crate wraps the hosted backend the studio runs on: the gallery and
//! project tables, the media bucket, and session-based auth. Every operation
//! is a single request with a single outcome; nothing is retried or cached.

pub mod auth;
pub mod config;
pub mod error;
pub mod gallery;
pub mod media;
pub mod project;
pub mod rest;

mod rows;

pub use auth::{AuthClient, AuthError, AuthResult, SessionSubscription};
pub use config::BaasConfig;
pub use error::{StoreError, StoreResult};
pub use gallery::GalleryStore;
pub use media::{MediaFile, MediaKind};
pub use project::ProjectStore;
pub use rest::Connection;
