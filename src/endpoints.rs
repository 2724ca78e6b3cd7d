//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/accounts/{account_id}', use [format_endpoint].

/// The root route which redirects to the accounts page.
pub const ROOT: &str = "/";
/// The page listing the user's accounts.
pub const ACCOUNTS_VIEW: &str = "/accounts";
/// The dialog for creating a new account.
pub const NEW_ACCOUNT_VIEW: &str = "/accounts/new";
/// The dialog for editing an existing account.
pub const EDIT_ACCOUNT_VIEW: &str = "/accounts/{account_id}/edit";
/// The dialog for deleting an account.
pub const DELETE_ACCOUNT_VIEW: &str = "/accounts/{account_id}/delete";
/// The dialog for changing an account's image.
pub const ACCOUNT_IMAGE_VIEW: &str = "/accounts/{account_id}/image";
/// The page listing the available currencies.
pub const CURRENCIES_VIEW: &str = "/currencies";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/login";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create an account.
pub const ACCOUNTS_API: &str = "/api/accounts";
/// The route to update or delete an account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route to upload or remove an account's image.
pub const ACCOUNT_IMAGE: &str = "/api/accounts/{account_id}/image";
/// The route for the image selected in the image dialog but not uploaded yet.
pub const STAGED_ACCOUNT_IMAGE: &str = "/api/accounts/{account_id}/image/staged";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/accounts/{account_id}', '{account_id}' is the parameter.
///
/// `id` is percent-encoded so that identifiers chosen by the backend always
/// form a single path segment.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        encode_path_segment(id),
        &endpoint_path[param_end..]
    )
}

fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());

    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }

    encoded
}
