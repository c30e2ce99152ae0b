//! Client-side checks and key naming for media uploads

use std::path::Path;

use chrono::{DateTime, Utc};
use mime::Mime;
use strum::{Display, EnumString};

use crate::error::{StoreError, StoreResult};

/// Largest accepted video, in bytes (100 MiB)
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;
/// Largest accepted image, in bytes (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// What the caller says the file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Size limit for this kind
    #[must_use]
    pub const fn max_bytes(self) -> usize {
        match self {
            Self::Image => MAX_IMAGE_BYTES,
            Self::Video => MAX_VIDEO_BYTES,
        }
    }

    /// Top-level MIME type this kind requires
    #[must_use]
    pub fn mime_type(self) -> mime::Name<'static> {
        match self {
            Self::Image => mime::IMAGE,
            Self::Video => mime::VIDEO,
        }
    }
}

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Original file name, used for the extension
    pub file_name: String,
    /// Declared MIME type
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Checks type and size against `kind` without touching the network
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the MIME type is not parseable,
    /// is not of the kind's top-level type, or the file is over the limit
    pub fn validate(&self, kind: MediaKind) -> StoreResult<Mime> {
        let mime: Mime = self.content_type.parse().map_err(|_| {
            StoreError::Validation(format!("unrecognised content type '{}'", self.content_type))
        })?;

        if mime.type_() != kind.mime_type() {
            return Err(StoreError::Validation(format!(
                "{kind} upload must have a {}/* content type, got '{mime}'",
                kind.mime_type()
            )));
        }

        if self.bytes.len() > kind.max_bytes() {
            return Err(StoreError::Validation(format!(
                "{kind} is {} bytes, limit is {} MiB",
                self.bytes.len(),
                kind.max_bytes() / (1024 * 1024)
            )));
        }

        Ok(mime)
    }

    /// Storage key derived from the upload time and the original extension.
    ///
    /// Falls back to the MIME subtype when the file name has no usable
    /// extension, so the key never carries URL-significant characters.
    #[must_use]
    pub fn storage_key(&self, mime: &Mime, now: DateTime<Utc>) -> String {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(url_safe_extension)
            .or_else(|| {
                let subtype = mime.subtype();
                subtype.as_str().split('+').next().and_then(url_safe_extension)
            })
            .unwrap_or_else(|| "bin".to_string());

        format!("{}.{extension}", now.timestamp_millis())
    }
}

fn url_safe_extension(candidate: &str) -> Option<String> {
    (!candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| candidate.to_ascii_lowercase())
}
