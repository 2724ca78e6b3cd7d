//! Implements a struct that holds the state of the web server.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    account::{InFlightRequests, UploadStaging},
    api::ApiClient,
    auth::ExpiredSessions,
    config::AppConfig,
    query::QueryCache,
    timezone::get_local_offset,
};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The server settings.
    pub config: AppConfig,

    /// The client for the backend REST API.
    pub api_client: ApiClient,

    /// Backend responses cached per session.
    pub cache: QueryCache,

    /// Account images selected for upload but not yet sent to the backend.
    pub staging: UploadStaging,

    /// Image uploads and removals that are currently being processed.
    pub in_flight: InFlightRequests,

    /// Sessions whose token the backend has rejected.
    pub expired_sessions: ExpiredSessions,
}

impl AppState {
    /// Create a new [AppState].
    ///
    /// `cookie_secret` is hashed into the key for the private auth cookie.
    ///
    /// # Errors
    /// Returns an error if the configured timezone is not a valid, canonical
    /// timezone name or the HTTP client for the backend cannot be created.
    pub fn new(config: AppConfig, cookie_secret: &str) -> Result<Self, Error> {
        if get_local_offset(&config.local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(config.local_timezone));
        }

        let api_client = ApiClient::new(config.api_base_url.as_url().clone())?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cache: QueryCache::new(config.cache_stale_time),
            config,
            api_client,
            staging: UploadStaging::default(),
            in_flight: InFlightRequests::default(),
            expired_sessions: ExpiredSessions::default(),
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
