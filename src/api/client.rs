//! The HTTP client for the backend REST API.

use std::time::Duration;

use reqwest::{StatusCode, Url};

use crate::api::{
    ApiError, ApiSession,
    error::extract_error_message,
    models::{AuthorizeResponse, Credentials},
};

/// How long to wait for the backend before giving up on a request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A configured client for the backend, shared by every session.
///
/// Requests that need a logged in user go through an [ApiSession], see
/// [ApiClient::session].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the backend served at `base_url`, e.g. "http://localhost:8080/v1".
    ///
    /// # Errors
    /// Returns [ApiError::Transport] if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Build the URL for a backend path given as separate segments, e.g.
    /// `["accounts", "42", "image"]`. Each segment is percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    /// Start a session that authenticates every request with `token`.
    pub fn session(&self, token: &str) -> ApiSession {
        ApiSession::new(self.clone(), token)
    }

    /// Exchange `credentials` for a bearer token.
    ///
    /// # Errors
    /// Returns [ApiError::Unauthorized] if the backend rejects the credentials,
    /// or another [ApiError] if the request fails.
    pub async fn authorize(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let url = self.endpoint(&["authorize"]);
        tracing::debug!("POST {url}");

        let response = self
            .http
            .post(url)
            .json(credentials)
            .send()
            .await
            .map_err(|error| {
                tracing::error!("could not reach the backend to authorize: {error}");
                ApiError::Transport(error.to_string())
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            status if status.is_success() => response
                .json::<AuthorizeResponse>()
                .await
                .map(|body| body.token)
                .map_err(|error| ApiError::Decode(error.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: extract_error_message(&body),
                })
            }
        }
    }
}
