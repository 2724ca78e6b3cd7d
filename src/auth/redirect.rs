//! Helpers for redirect URLs during authentication flows.

use axum::{extract::Request, http::Uri};
use tracing::{error, warn};

use crate::endpoints;

fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(redirect_url);

    path != endpoints::LOG_IN_VIEW && !path.starts_with("/api/")
}

/// Reduce `raw_url` to a local path and query that is safe to redirect to.
///
/// Returns `None` for absolute URLs, protocol relative URLs, API routes and
/// the log-in page itself.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

fn normalize_hx_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// Whether `request` was sent by HTMX.
pub(crate) fn is_hx_request(request: &Request) -> bool {
    request
        .headers()
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"))
}

/// Build the log-in URL that sends the user back to where they were.
///
/// HTMX requests return to the page that issued them (`HX-Current-URL`),
/// since the fragment route itself is not a page. Other requests return to
/// the requested URL. Falls back to the accounts page.
pub fn build_log_in_redirect_url(request: &Request) -> String {
    let redirect_target = if is_hx_request(request) {
        redirect_target_from_hx_request(request)
    } else {
        redirect_target_from_request_uri(request)
    };

    let redirect_target = redirect_target.unwrap_or_else(|| {
        if request.uri().path().starts_with("/api") {
            warn!("Missing or invalid HTMX headers for /api request. Falling back to accounts.");
        }

        endpoints::ACCOUNTS_VIEW.to_owned()
    });

    build_log_in_redirect_url_from_target(&redirect_target)
        .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
}

pub(super) fn build_log_in_redirect_url_from_target(redirect_target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", redirect_target)]) {
        Ok(param) => Some(format!("{}?{}", endpoints::LOG_IN_VIEW, param)),
        Err(error) => {
            error!("Could not encode redirect URL {redirect_target}: {error}");
            None
        }
    }
}

fn redirect_target_from_request_uri(request: &Request) -> Option<String> {
    let path_and_query = request.uri().path_and_query()?.as_str();
    normalize_redirect_url(path_and_query)
}

fn redirect_target_from_hx_request(request: &Request) -> Option<String> {
    let current_url = match request
        .headers()
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    {
        Some(value) => value,
        None => {
            warn!("Missing HX-Current-URL header for HTMX request.");
            return None;
        }
    };

    let redirect_url = normalize_hx_current_url(current_url);
    if redirect_url.is_none() {
        warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}
