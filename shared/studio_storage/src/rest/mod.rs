//! Wire seams to the hosted backend.
//!
//! The store clients never talk HTTP themselves; they go through the three
//! traits below. [`HttpBackend`] implements all of them against the real
//! service, and `mock::InMemoryBackend` (feature `test-utils`) implements
//! them in memory for tests.

mod error;
mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::sync::Arc;

use common_types::{AuthUser, Session};
use serde_json::Value;

pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;

use crate::config::BaasConfig;

/// Row filter understood by the table API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Eq(String, String),
}

impl Filter {
    /// Shorthand for an equality filter
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq(column.into(), value.into())
    }
}

/// Sort order for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Column to sort on
    pub column: String,
    /// Newest/largest first when true
    pub descending: bool,
}

/// A structured select: filters, ordering and an optional row limit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Every filter must hold
    pub filters: Vec<Filter>,
    /// Result ordering
    pub order: Option<Order>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl Query {
    /// Select every row
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter
    #[must_use]
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Orders by `column`, largest first
    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            descending: true,
        });
        self
    }

    /// Caps the number of rows returned
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row storage: structured queries over named tables
#[async_trait::async_trait]
pub trait TableApi: Send + Sync {
    /// Returns the rows matching `query`
    async fn select(
        &self,
        table: &str,
        query: &Query,
        bearer: Option<&str>,
    ) -> BackendResult<Vec<Value>>;

    /// Inserts one row and returns it as stored
    async fn insert(&self, table: &str, row: Value, bearer: Option<&str>) -> BackendResult<Value>;

    /// Applies `patch` to every row matching `filters`, returning the updated rows
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
        bearer: Option<&str>,
    ) -> BackendResult<Vec<Value>>;

    /// Deletes every row matching `filters`
    async fn delete(&self, table: &str, filters: &[Filter], bearer: Option<&str>)
        -> BackendResult<()>;
}

/// Object storage with public read URLs
#[async_trait::async_trait]
pub trait ObjectStorageApi: Send + Sync {
    /// Stores `bytes` under `key` in `bucket`
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
        bearer: Option<&str>,
    ) -> BackendResult<()>;

    /// Durable public URL of an object
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Session-based authentication
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Email/password sign in
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session>;

    /// Registers an account; confirmation happens out of band
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;

    /// Revokes the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    /// Trades a one-time redirect code for a session
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>)
        -> BackendResult<Session>;

    /// Issues a fresh session from a refresh token
    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session>;

    /// The server's current view of the token's user
    async fn user(&self, access_token: &str) -> BackendResult<AuthUser>;

    /// URL that starts an external identity hand-off
    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String;
}

/// The three wire seams plus the storage bucket they share
#[derive(Clone)]
pub struct Connection {
    /// Table access
    pub tables: Arc<dyn TableApi>,
    /// Object storage
    pub storage: Arc<dyn ObjectStorageApi>,
    /// Authentication
    pub auth: Arc<dyn AuthApi>,
    /// Bucket that receives media uploads
    pub bucket: String,
}

impl Connection {
    /// Connects all three seams to the hosted service over HTTP
    #[must_use]
    pub fn http(config: &BaasConfig) -> Self {
        let backend = Arc::new(HttpBackend::new(config));
        Self {
            tables: backend.clone(),
            storage: backend.clone(),
            auth: backend,
            bucket: config.bucket.clone(),
        }
    }

    /// Connects when configuration is present, otherwise stays unconfigured
    #[must_use]
    pub fn from_config(config: Option<&BaasConfig>) -> Option<Self> {
        config.map(Self::http)
    }
}
