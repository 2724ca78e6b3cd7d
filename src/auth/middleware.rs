//! Authentication middleware that loads the session from the cookie and handles expired sessions.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::{HX_RESWAP, HxRedirect};

use crate::{
    AppState,
    account::UploadStaging,
    api::ApiClient,
    auth::{
        ExpiredSessions, build_log_in_redirect_url,
        cookie::{get_token_from_cookies, invalidate_auth_cookie},
        redirect::is_hx_request,
    },
    query::QueryCache,
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    pub api_client: ApiClient,
    pub cache: QueryCache,
    pub staging: UploadStaging,
    pub expired_sessions: ExpiredSessions,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            api_client: state.api_client.clone(),
            cache: state.cache.clone(),
            staging: state.staging.clone(),
            expired_sessions: state.expired_sessions.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// The response for a request whose session has already been sent to the log-in page.
///
/// HTMX is told not to swap anything, so the earlier redirect is the only navigation.
fn already_expired_response() -> Response {
    (StatusCode::UNAUTHORIZED, [(HX_RESWAP, "none")]).into_response()
}

/// Middleware function that checks for an auth cookie and handles expired sessions.
///
/// The `ApiSession` for the cookie's token is placed into the request and the
/// request executed normally if the cookie is present, otherwise a redirect to
/// the log-in page is returned using `get_redirect`.
///
/// If the backend rejects the token while the request is handled, the first
/// failing request of the session clears the cookie and redirects to the log-in
/// page. Any other request of that session gets a bare 401.
///
/// **Note**: Route handlers can use the function argument `Extension(session): Extension<ApiSession>` to receive the session.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request);
    let is_hx = is_hx_request(&request);

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let Some(token) = get_token_from_cookies(&jar) else {
        return get_redirect(&log_in_redirect_url);
    };

    let session = state.api_client.session(&token);

    if state.expired_sessions.contains(session.key()) {
        tracing::debug!("Rejecting request for expired session {}", session.key());

        if is_hx {
            return already_expired_response();
        }

        return (invalidate_auth_cookie(jar), get_redirect(&log_in_redirect_url)).into_response();
    }

    parts.extensions.insert(session.clone());
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    if !session.is_expired() {
        return response;
    }

    let key = session.key();
    if !state.expired_sessions.expire(key) {
        return already_expired_response();
    }

    tracing::info!("Session {key} has expired. Redirecting to log in page.");
    state.cache.clear_session(key);
    state.staging.clear_session(key);

    (invalidate_auth_cookie(jar), get_redirect(&log_in_redirect_url)).into_response()
}

/// Middleware function that checks for an auth cookie.
/// The session is placed into the request and the request executed normally if the cookie is present, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(session): Extension<ApiSession>` to receive the session.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for an auth cookie.
/// The session is placed into the request and the request executed normally if the cookie is present, otherwise a HTMX redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(session): Extension<ApiSession>` to receive the session.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
