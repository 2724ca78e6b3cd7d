//! Log-out route handler that invalidates the auth cookie and forgets the session's data.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    api::SessionKey,
    auth::{
        AuthState,
        cookie::{get_token_from_cookies, invalidate_auth_cookie},
    },
    endpoints,
};

/// Invalidate the auth cookie, drop the session's cached data and staged
/// uploads, and redirect the client to the log-in page.
pub async fn get_log_out(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    if let Some(token) = get_token_from_cookies(&jar) {
        let key = SessionKey::from_token(&token);
        state.cache.clear_session(&key);
        state.staging.clear_session(&key);
        tracing::debug!("Logged out session {key}");
    }

    let jar = invalidate_auth_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
