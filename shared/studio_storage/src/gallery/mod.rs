//! Gallery store: the public showcase of finished visualizations

use std::sync::Arc;

use chrono::Utc;
use common_types::{GalleryEntry, GalleryEntryPatch, NewGalleryEntry};
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthClient;
use crate::error::{StoreError, StoreResult};
use crate::media::{MediaFile, MediaKind};
use crate::rest::{Connection, Filter, Query};
use crate::rows::{parse_row, parse_rows_lenient};

/// Table holding gallery entries
pub const GALLERY_TABLE: &str = "gallery_items";

/// Column names of the gallery table used in queries
mod column {
    pub const ID: &str = "id";
    pub const CREATED_AT: &str = "created_at";
    pub const FEATURED: &str = "featured";
}

/// Storage client for gallery entries and their media
pub struct GalleryStore {
    connection: Option<Connection>,
    auth: Arc<AuthClient>,
}

impl GalleryStore {
    /// Creates a new store; `None` runs unconfigured
    #[must_use]
    pub const fn new(connection: Option<Connection>, auth: Arc<AuthClient>) -> Self {
        Self { connection, auth }
    }

    fn connection(&self) -> StoreResult<&Connection> {
        self.connection.as_ref().ok_or_else(StoreError::not_configured)
    }

    /// Every entry, newest first.
    ///
    /// Never fails: an unconfigured or unreachable backend yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Vec<GalleryEntry> {
        self.list(Query::new().order_desc(column::CREATED_AT)).await
    }

    /// Featured entries, newest first. Degrades like [`Self::list_all`].
    #[instrument(skip(self))]
    pub async fn list_featured(&self) -> Vec<GalleryEntry> {
        self.list(
            Query::new()
                .filter_eq(column::FEATURED, "true")
                .order_desc(column::CREATED_AT),
        )
        .await
    }

    async fn list(&self, query: Query) -> Vec<GalleryEntry> {
        let Some(connection) = &self.connection else {
            debug!("gallery backend not configured, returning no entries");
            return Vec::new();
        };

        let bearer = self.auth.access_token();
        match connection
            .tables
            .select(GALLERY_TABLE, &query, bearer.as_deref())
            .await
        {
            Ok(rows) => parse_rows_lenient(GALLERY_TABLE, rows),
            Err(e) => {
                warn!("failed to load gallery, showing no entries: {e}");
                Vec::new()
            }
        }
    }

    /// Creates an entry; the store assigns id and timestamps
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` when unconfigured and
    /// `StoreError::Backend` when the service rejects the row
    #[instrument(skip(self, entry), fields(title = %entry.title))]
    pub async fn create(&self, entry: NewGalleryEntry) -> StoreResult<GalleryEntry> {
        let connection = self.connection()?;
        let bearer = self.auth.access_token();

        let row = connection
            .tables
            .insert(GALLERY_TABLE, serde_json::to_value(&entry)?, bearer.as_deref())
            .await?;
        let created: GalleryEntry = parse_row(row)?;

        info!("created gallery entry {}", created.id);
        Ok(created)
    }

    /// Applies a partial update; the server refreshes `updated_at`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when no entry has `id`,
    /// `StoreError::Configuration` when unconfigured, otherwise
    /// `StoreError::Backend`
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: GalleryEntryPatch) -> StoreResult<GalleryEntry> {
        let connection = self.connection()?;
        let bearer = self.auth.access_token();

        let rows = connection
            .tables
            .update(
                GALLERY_TABLE,
                &[Filter::eq(column::ID, id)],
                serde_json::to_value(&patch)?,
                bearer.as_deref(),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("gallery entry {id}")))?;
        parse_row(row)
    }

    /// Deletes an entry. Deleting an id that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` when unconfigured, otherwise
    /// `StoreError::Backend`
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let connection = self.connection()?;
        let bearer = self.auth.access_token();

        connection
            .tables
            .delete(GALLERY_TABLE, &[Filter::eq(column::ID, id)], bearer.as_deref())
            .await?;

        info!("deleted gallery entry {id}");
        Ok(())
    }

    /// Uploads one media file and returns its public URL.
    ///
    /// Type and size are checked before anything is sent. Single attempt.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for a wrong type or oversized file,
    /// `StoreError::Configuration` when unconfigured, otherwise
    /// `StoreError::Backend`
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload_media(&self, file: MediaFile, kind: MediaKind) -> StoreResult<String> {
        let mime = file.validate(kind)?;
        let connection = self.connection()?;
        let bearer = self.auth.access_token();

        let key = file.storage_key(&mime, Utc::now());
        connection
            .storage
            .upload(
                &connection.bucket,
                &key,
                mime.essence_str(),
                file.bytes,
                bearer.as_deref(),
            )
            .await?;

        let url = connection.storage.public_url(&connection.bucket, &key);
        info!("uploaded {kind} to {url}");
        Ok(url)
    }
}
