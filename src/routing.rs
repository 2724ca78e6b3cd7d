//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    account::{
        create_account_endpoint, delete_account_endpoint, delete_account_image_endpoint,
        discard_staged_account_image, get_account_image_dialog, get_accounts_page,
        get_delete_account_dialog, get_edit_account_dialog, get_new_account_dialog,
        get_staged_account_image, stage_account_image_endpoint, update_account_endpoint,
        upload_account_image_endpoint,
    },
    auth::{auth_guard, auth_guard_hx, get_log_in_page, get_log_out, post_log_in},
    currency::get_currencies_page,
    endpoints,
    not_found::get_404_not_found,
};

/// Room for the multipart boundaries and headers around a staged image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::ACCOUNTS_VIEW, get(get_accounts_page))
        .route(endpoints::CURRENCIES_VIEW, get(get_currencies_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // Dialogs and mutations are requested by HTMX, so auth redirects must use the HX-Redirect header.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::NEW_ACCOUNT_VIEW, get(get_new_account_dialog))
            .route(endpoints::EDIT_ACCOUNT_VIEW, get(get_edit_account_dialog))
            .route(
                endpoints::DELETE_ACCOUNT_VIEW,
                get(get_delete_account_dialog),
            )
            .route(
                endpoints::ACCOUNT_IMAGE_VIEW,
                get(get_account_image_dialog),
            )
            .route(endpoints::ACCOUNTS_API, post(create_account_endpoint))
            .route(
                endpoints::ACCOUNT,
                put(update_account_endpoint).delete(delete_account_endpoint),
            )
            .route(
                endpoints::ACCOUNT_IMAGE,
                post(upload_account_image_endpoint).delete(delete_account_image_endpoint),
            )
            .route(
                endpoints::STAGED_ACCOUNT_IMAGE,
                get(get_staged_account_image)
                    .post(stage_account_image_endpoint)
                    .delete(discard_staged_account_image)
                    .layer(DefaultBodyLimit::max(
                        state.config.max_image_bytes + MULTIPART_OVERHEAD_BYTES,
                    )),
            )
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

/// The root path '/' redirects to the accounts page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::ACCOUNTS_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{
        endpoints,
        routing::get_index_page,
        test_utils::{FakeBackend, logged_in_server, test_server},
    };

    #[tokio::test]
    async fn root_redirects_to_accounts() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::ACCOUNTS_VIEW);
    }

    #[tokio::test]
    async fn coffee_is_refused() {
        let backend = FakeBackend::start().await;
        let server = test_server(&backend);

        server
            .get(endpoints::COFFEE)
            .await
            .assert_status(StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let backend = FakeBackend::start().await;
        let server = logged_in_server(&backend);

        server.get("/nope").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn dialog_without_session_redirects_with_hx_header() {
        let backend = FakeBackend::start().await;
        let server = test_server(&backend);

        let response = server
            .get(endpoints::NEW_ACCOUNT_VIEW)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", "http://localhost/accounts")
            .await;

        response.assert_status_ok();
        let location = response.header("hx-redirect");
        assert!(
            location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
            "want redirect to the log-in page, got {location:?}"
        );
    }
}
