//! Connection settings for the hosted backend

use std::env;

use tracing::{error, warn};
use url::Url;

/// Environment variable holding the service URL
pub const URL_VAR: &str = "SUPABASE_URL";
/// Environment variable holding the anonymous API key
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
/// Environment variable naming the media bucket
pub const BUCKET_VAR: &str = "SUPABASE_STORAGE_BUCKET";
/// Bucket used when none is configured
pub const DEFAULT_BUCKET: &str = "gallery-media";

/// Service URL, anonymous key and media bucket
#[derive(Clone, PartialEq, Eq)]
pub struct BaasConfig {
    /// Root URL of the service, e.g. `https://abc.supabase.co`
    pub url: Url,
    /// Public anonymous API key
    pub anon_key: String,
    /// Bucket that receives media uploads
    pub bucket: String,
}

impl BaasConfig {
    /// Builds a config with the default bucket
    #[must_use]
    pub fn new(url: Url, anon_key: impl Into<String>) -> Self {
        Self {
            url,
            anon_key: anon_key.into(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    /// Overrides the media bucket
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Reads the config from the process environment.
    ///
    /// Returns `None` when either required value is missing, blank or not a
    /// valid URL; callers then run unconfigured instead of failing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            env::var(URL_VAR).ok(),
            env::var(ANON_KEY_VAR).ok(),
            env::var(BUCKET_VAR).ok(),
        )
    }

    /// Same as [`Self::from_env`] over explicit values
    #[must_use]
    pub fn from_values(
        url: Option<String>,
        anon_key: Option<String>,
        bucket: Option<String>,
    ) -> Option<Self> {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (Some(url), Some(anon_key)) = (non_blank(url), non_blank(anon_key)) else {
            warn!("{URL_VAR} or {ANON_KEY_VAR} is not set, running without a backend");
            return None;
        };

        let url = match Url::parse(&url) {
            Ok(url) => url,
            Err(e) => {
                error!("{URL_VAR} is not a valid URL ({e}), running without a backend");
                return None;
            }
        };

        let config = Self::new(url, anon_key);
        Some(match non_blank(bucket) {
            Some(bucket) => config.with_bucket(bucket),
            None => config,
        })
    }
}

// The anon key is public but still kept out of logs.
impl std::fmt::Debug for BaasConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaasConfig")
            .field("url", &self.url.as_str())
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}
