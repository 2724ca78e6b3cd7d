//! Server configuration shared by the binary and the router.

use std::{fmt::Display, time::Duration};

use reqwest::Url;

use crate::Error;

/// The default time a cached query result is considered fresh.
pub const DEFAULT_CACHE_STALE_TIME: Duration = Duration::from_secs(30);

/// The default upper limit for an uploaded account image.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// How the server reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Talk to the backend origin directly.
    #[default]
    Development,
    /// Go through the same-origin reverse proxy under `/api`.
    Production,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

/// The base URL that every backend path is appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBaseUrl(Url);

impl ApiBaseUrl {
    /// Pick the backend base URL for `mode`.
    ///
    /// In development the backend is called directly at `{backend_origin}/v1`.
    /// In production requests go through the reverse proxy at
    /// `{public_origin}/api/v1`.
    ///
    /// # Errors
    /// Returns [Error::InvalidBackendUrl] if the chosen origin is not a valid
    /// http(s) URL.
    pub fn resolve(mode: Mode, backend_origin: &str, public_origin: &str) -> Result<Self, Error> {
        let (origin, path) = match mode {
            Mode::Development => (backend_origin, "v1"),
            Mode::Production => (public_origin, "api/v1"),
        };

        let raw_url = format!("{}/{path}", origin.trim_end_matches('/'));
        let url = Url::parse(&raw_url).map_err(|error| {
            tracing::error!("invalid backend URL {raw_url}: {error}");
            Error::InvalidBackendUrl(raw_url.clone())
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidBackendUrl(raw_url));
        }

        Ok(Self(url))
    }

    /// The URL as a [Url].
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl Display for ApiBaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings that shape how the app talks to the backend and renders pages.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where backend requests go.
    pub api_base_url: ApiBaseUrl,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How long a cached query result is served before it is fetched again.
    pub cache_stale_time: Duration,
    /// The largest account image, in bytes, that may be staged for upload.
    pub max_image_bytes: usize,
}

impl AppConfig {
    /// Create a config with the default cache and upload limits.
    pub fn new(api_base_url: ApiBaseUrl, local_timezone: &str) -> Self {
        Self {
            api_base_url,
            local_timezone: local_timezone.to_owned(),
            cache_stale_time: DEFAULT_CACHE_STALE_TIME,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}
