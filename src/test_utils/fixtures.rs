//! Sample data and ready-to-use servers for route tests.

use axum::response::IntoResponse;
use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
use axum_test::TestServer;
use time::macros::date;

use crate::{
    AppState,
    api::{Account, AccountId, AccountType, Audit, BankInfo, Currency, CurrencyId},
    app_state::create_cookie_key,
    auth::{COOKIE_TOKEN, set_auth_cookie},
    build_router,
    config::{ApiBaseUrl, AppConfig, Mode},
    test_utils::FakeBackend,
};

/// The cookie secret used by [test_state].
pub(crate) const TEST_SECRET: &str = "aecMee4ohsh9ooph";

/// Three accounts of mixed types. "C" has no optional values at all.
pub(crate) fn sample_accounts() -> Vec<Account> {
    vec![
        Account {
            id: AccountId::new("A"),
            name: "Everyday".to_owned(),
            kind: AccountType::Asset,
            description: Some("Day to day spending".to_owned()),
            bank_info: Some(BankInfo {
                account_id: Some("12-3456-7890123-00".to_owned()),
                bank_id: Some("ASB".to_owned()),
                ..Default::default()
            }),
            show_in_dashboard_summary: true,
            hide_from_reports: false,
            opening_date: Some(date!(2024 - 04 - 01)),
            closing_date: None,
            ignore_unprocessed_before: None,
            image: None,
            audit: Audit::default(),
        },
        Account {
            id: AccountId::new("B"),
            name: "Salary".to_owned(),
            kind: AccountType::Income,
            description: Some("Monthly pay".to_owned()),
            bank_info: None,
            show_in_dashboard_summary: false,
            hide_from_reports: false,
            opening_date: None,
            closing_date: None,
            ignore_unprocessed_before: Some(date!(2024 - 01 - 01)),
            image: None,
            audit: Audit::default(),
        },
        Account {
            id: AccountId::new("C"),
            name: "groceries".to_owned(),
            kind: AccountType::Expense,
            description: None,
            bank_info: None,
            show_in_dashboard_summary: false,
            hide_from_reports: true,
            opening_date: None,
            closing_date: None,
            ignore_unprocessed_before: None,
            image: None,
            audit: Audit::default(),
        },
    ]
}

/// A currency with a symbol and one without symbol or fractional digits.
pub(crate) fn sample_currencies() -> Vec<Currency> {
    vec![
        Currency {
            id: CurrencyId::new("1"),
            name: "NZD".to_owned(),
            symbol: Some("$".to_owned()),
            decimal_places: Some(2),
            audit: Audit::default(),
        },
        Currency {
            id: CurrencyId::new("2"),
            name: "JPY".to_owned(),
            symbol: None,
            decimal_places: Some(0),
            audit: Audit::default(),
        },
    ]
}

/// The encrypted auth cookie holding `token`, as the browser would send it back.
pub(crate) fn auth_cookie(secret: &str, token: &str) -> Cookie<'static> {
    let jar = set_auth_cookie(
        PrivateCookieJar::new(create_cookie_key(secret)),
        token,
        None,
    );
    let response = jar.into_response();
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("No Set-Cookie header")
        .to_str()
        .expect("Could not convert Set-Cookie header to str")
        .to_owned();
    let cookie = Cookie::parse(set_cookie).expect("Could not parse Set-Cookie header");

    Cookie::new(COOKIE_TOKEN, cookie.value().to_owned())
}

/// The app state for a server that talks to `backend`.
pub(crate) fn test_state(backend: &FakeBackend) -> AppState {
    let api_base_url = ApiBaseUrl::resolve(Mode::Development, &backend.origin(), "")
        .expect("Invalid fake backend origin");

    AppState::new(AppConfig::new(api_base_url, "Pacific/Auckland"), TEST_SECRET)
        .expect("Could not create app state")
}

/// The full app without a session.
pub(crate) fn test_server(backend: &FakeBackend) -> TestServer {
    TestServer::new(build_router(test_state(backend)))
}

/// The full app where every request carries the auth cookie for [FakeBackend::TOKEN].
pub(crate) fn logged_in_server(backend: &FakeBackend) -> TestServer {
    logged_in_server_with_state(test_state(backend))
}

pub(crate) fn logged_in_server_with_state(state: AppState) -> TestServer {
    let mut server = TestServer::new(build_router(state));
    server.add_cookie(auth_cookie(TEST_SECRET, FakeBackend::TOKEN));

    server
}
