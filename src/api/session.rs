//! Authenticated access to the backend on behalf of one logged in user.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use reqwest::{RequestBuilder, Response, StatusCode, multipart};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::api::{ApiClient, ApiError, error::extract_error_message};

/// Identifies a session without exposing its token, e.g. in cache keys and logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive the key for the session authenticated by `token`.
    pub fn from_token(token: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(token.as_bytes())))
    }
}

impl Display for SessionKey {
    /// Only a prefix of the hash is shown, which is enough to tell sessions apart in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.get(..12).unwrap_or(&self.0))
    }
}

/// A handle for making authenticated backend requests.
///
/// Clones share the same expiry latch: once any request made through the
/// session (or one of its clones) is rejected with HTTP 401, the session is
/// expired for all of them.
#[derive(Debug, Clone)]
pub struct ApiSession {
    client: ApiClient,
    token: Arc<str>,
    key: SessionKey,
    expired: Arc<AtomicBool>,
}

impl ApiSession {
    pub(crate) fn new(client: ApiClient, token: &str) -> Self {
        Self {
            client,
            token: Arc::from(token),
            key: SessionKey::from_token(token),
            expired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Whether the backend has rejected this session's token.
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Mark the session as expired, returning `true` only for the first call.
    fn mark_expired(&self) -> bool {
        !self.expired.swap(true, Ordering::SeqCst)
    }

    /// Send `request` with the bearer token and map failure statuses to [ApiError].
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|error| {
                tracing::error!("could not reach the backend: {error}");
                ApiError::Transport(error.to_string())
            })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            if self.mark_expired() {
                tracing::warn!("backend rejected the token for session {}", self.key);
            }

            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            tracing::debug!("backend answered {status}: {body}");

            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// `GET` the resource at `segments` and decode it as JSON.
    pub async fn get_json<T>(&self, segments: &[&str]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.client.endpoint(segments);
        tracing::debug!("GET {url}");

        self.send(self.client.http().get(url))
            .await?
            .json::<T>()
            .await
            .map_err(|error| ApiError::Decode(error.to_string()))
    }

    /// `POST` `body` as JSON to `segments`. The response body is ignored.
    pub async fn post_json<B>(&self, segments: &[&str], body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.client.endpoint(segments);
        tracing::debug!("POST {url}");

        self.send(self.client.http().post(url).json(body))
            .await
            .map(|_| ())
    }

    /// `PUT` `body` as JSON to `segments`. The response body is ignored.
    pub async fn put_json<B>(&self, segments: &[&str], body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.client.endpoint(segments);
        tracing::debug!("PUT {url}");

        self.send(self.client.http().put(url).json(body))
            .await
            .map(|_| ())
    }

    /// `DELETE` the resource at `segments`, adding `query` parameters when non-empty.
    pub async fn delete(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<(), ApiError> {
        let mut url = self.client.endpoint(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        tracing::debug!("DELETE {url}");

        self.send(self.client.http().delete(url))
            .await
            .map(|_| ())
    }

    /// `POST` a multipart `form` to `segments`.
    pub async fn post_multipart(
        &self,
        segments: &[&str],
        form: multipart::Form,
    ) -> Result<(), ApiError> {
        let url = self.client.endpoint(segments);
        tracing::debug!("POST (multipart) {url}");

        self.send(self.client.http().post(url).multipart(form))
            .await
            .map(|_| ())
    }
}
