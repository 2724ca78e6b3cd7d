//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The backend checks the credentials, this module only exchanges them for a token and stores it.

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState,
    api::{ApiClient, ApiError, Credentials, GENERIC_ERROR_MESSAGE},
    auth::{normalize_redirect_url, set_auth_cookie},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        loading_spinner, log_in_layout,
    },
};

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    autocomplete="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus
                    value=(username);
            }

            div
            {
                label for="password" class=(FORM_LABEL_STYLE) { "Password" }

                input
                    type="password"
                    name="password"
                    id="password"
                    placeholder="••••••••"
                    autocomplete="current-password"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;

                @if let Some(error_message) = error_message
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class=(FORM_CHECKBOX_STYLE);

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = log_in_layout("Log in to your account", &log_in_form);
    base("Log In", &content).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    pub api_client: ApiClient,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            api_client: state.api_client.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect username or password.";

/// Handler for log-in requests via the POST method.
///
/// The credentials are exchanged for a bearer token at the backend. On success
/// the token is stored in the auth cookie and the client is redirected to the
/// requested page, or the accounts page. Otherwise, the form is returned with
/// an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let credentials = Credentials {
        username: user_data.username.trim().to_owned(),
        password: user_data.password,
    };

    let token = match state.api_client.authorize(&credentials).await {
        Ok(token) => token,
        Err(ApiError::Unauthorized) => {
            return log_in_form(
                &credentials.username,
                Some(INVALID_CREDENTIALS_ERROR_MSG),
                redirect_url,
            )
            .into_response();
        }
        Err(ApiError::Rejected { message, .. }) => {
            tracing::warn!("The backend refused the log-in request: {message}");
            return log_in_form(&credentials.username, Some(&message), redirect_url)
                .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while exchanging credentials: {error}");
            return log_in_form(
                &credentials.username,
                Some(&format!("{GENERIC_ERROR_MESSAGE}. Please try again later.")),
                redirect_url,
            )
            .into_response();
        }
    };

    let cookie_duration = user_data
        .remember_me
        .is_some()
        .then_some(REMEMBER_ME_COOKIE_DURATION);
    let redirect_url = redirect_url.unwrap_or(endpoints::ACCOUNTS_VIEW);

    (
        StatusCode::SEE_OTHER,
        HxRedirect(redirect_url.to_owned()),
        set_auth_cookie(jar, &token, cookie_duration),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub username: String,

    /// Password entered during log-in. Only ever forwarded to the backend.
    pub password: String,

    /// Whether to keep the auth cookie after the browser is closed.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}


#[cfg(test)]
mod log_in_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_htmx::HX_REDIRECT;
    use axum_test::TestServer;
    use time::{Duration, OffsetDateTime};

    use crate::{
        api::ApiClient,
        app_state::create_cookie_key,
        auth::COOKIE_TOKEN,
        endpoints,
        test_utils::{FakeBackend, assert_valid_html, parse_html_fragment_text},
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, LoginState, REMEMBER_ME_COOKIE_DURATION, post_log_in};

    fn get_test_server(backend: &FakeBackend) -> TestServer {
        let state = LoginState {
            cookie_key: create_cookie_key("foobar"),
            api_client: ApiClient::new(backend.base_url()).unwrap(),
        };
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let backend = FakeBackend::start().await;
        let server = get_test_server(&backend);
        let form = [
            ("username", FakeBackend::USERNAME),
            ("password", FakeBackend::PASSWORD),
        ];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(HX_REDIRECT),
            endpoints::ACCOUNTS_VIEW,
            "want redirect to the accounts page"
        );
        let cookie = response.cookie(COOKIE_TOKEN);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.expires_datetime(), None);
    }

    #[tokio::test]
    async fn log_in_redirects_to_requested_url() {
        let backend = FakeBackend::start().await;
        let server = get_test_server(&backend);
        let redirect_url = "/currencies";
        let form = [
            ("username", FakeBackend::USERNAME),
            ("password", FakeBackend::PASSWORD),
            ("redirect_url", redirect_url),
        ];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        assert_eq!(response.header(HX_REDIRECT), redirect_url);
    }

    #[tokio::test]
    async fn log_in_falls_back_on_invalid_redirect_url() {
        let backend = FakeBackend::start().await;
        let server = get_test_server(&backend);
        let form = [
            ("username", FakeBackend::USERNAME),
            ("password", FakeBackend::PASSWORD),
            ("redirect_url", "https://example.com"),
        ];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        assert_eq!(response.header(HX_REDIRECT), endpoints::ACCOUNTS_VIEW);
    }

    #[tokio::test]
    async fn remember_me_extends_auth_cookie() {
        let backend = FakeBackend::start().await;
        let server = get_test_server(&backend);
        let form = [
            ("username", FakeBackend::USERNAME),
            ("password", FakeBackend::PASSWORD),
            ("remember_me", "on"),
        ];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        let expires = response
            .cookie(COOKIE_TOKEN)
            .expires_datetime()
            .unwrap();
        let want = OffsetDateTime::now_utc() + REMEMBER_ME_COOKIE_DURATION;
        assert!(
            (expires - want).abs() < Duration::seconds(2),
            "got date time {expires:?}, want {want:?}"
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let backend = FakeBackend::start().await;
        let server = get_test_server(&backend);

        server
            .post(endpoints::LOG_IN_API)
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let backend = FakeBackend::start().await;
        let server = get_test_server(&backend);
        let form = [("username", FakeBackend::USERNAME), ("password", "wrong")];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        response.assert_status_ok();
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_none());
        let fragment = parse_html_fragment_text(&response.text());
        assert_valid_html(&fragment);
        let error_selector =
            scraper::Selector::parse("input#password + p.text-red-500.text-base").unwrap();
        let errors = fragment.select(&error_selector).collect::<Vec<_>>();
        assert_eq!(errors.len(), 1, "want 1 password error message");
        assert_eq!(
            errors[0].text().collect::<String>(),
            INVALID_CREDENTIALS_ERROR_MSG
        );
        let username_selector = scraper::Selector::parse("input#username").unwrap();
        assert_eq!(
            fragment
                .select(&username_selector)
                .next()
                .and_then(|input| input.value().attr("value")),
            Some(FakeBackend::USERNAME),
            "the username should be kept"
        );
    }

    #[tokio::test]
    async fn log_in_reports_unreachable_backend() {
        let state = LoginState {
            cookie_key: create_cookie_key("foobar"),
            api_client: ApiClient::new("http://127.0.0.1:9/v1".parse().unwrap()).unwrap(),
        };
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);
        let server = TestServer::new(app);
        let form = [("username", "user"), ("password", "password")];

        let response = server.post(endpoints::LOG_IN_API).form(&form).await;

        response.assert_status_ok();
        assert!(response.text().contains("Something went wrong"));
    }
}
