//! An in-process stand-in for the finance backend that records every request.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use reqwest::Url;
use serde_json::json;
use tokio::{net::TcpListener, sync::watch};

use crate::api::{Account, AccountId, AccountPayload, BankInfo, Credentials, Currency};

/// A request as the fake backend received it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Debug, Default)]
struct BackendData {
    accounts: Vec<Account>,
    currencies: Vec<Currency>,
    requests: Vec<RecordedRequest>,
    next_account: usize,
    failed_reads: Option<(u16, String)>,
    failed_mutations: Option<(u16, String)>,
    reject_tokens_after: Option<usize>,
}

#[derive(Debug, Clone)]
struct BackendState {
    data: Arc<Mutex<BackendData>>,
    /// The number of authenticated requests seen since tokens started being rejected.
    arrived: Arc<watch::Sender<usize>>,
}

impl BackendState {
    fn lock(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The backend served on a random local port for the lifetime of a test.
pub(crate) struct FakeBackend {
    state: BackendState,
    address: SocketAddr,
}

impl FakeBackend {
    /// The token issued for [FakeBackend::USERNAME] and [FakeBackend::PASSWORD].
    pub const TOKEN: &str = "test-token";
    pub const USERNAME: &str = "alice";
    pub const PASSWORD: &str = "correct horse battery staple";

    pub async fn start() -> Self {
        let state = BackendState {
            data: Arc::new(Mutex::new(BackendData::default())),
            arrived: Arc::new(watch::channel(0).0),
        };
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Could not bind the fake backend");
        let address = listener
            .local_addr()
            .expect("Could not get the fake backend address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("The fake backend stopped");
        });

        Self { state, address }
    }

    /// The origin, e.g. "http://127.0.0.1:1234".
    pub fn origin(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("{}/v1", self.origin())).expect("Invalid fake backend URL")
    }

    pub fn set_accounts(&self, accounts: Vec<Account>) {
        self.state.lock().accounts = accounts;
    }

    pub fn set_currencies(&self, currencies: Vec<Currency>) {
        self.state.lock().currencies = currencies;
    }

    /// Answer every `GET` with `status` and `message`.
    pub fn fail_reads_with(&self, status: u16, message: &str) {
        self.state.lock().failed_reads = Some((status, message.to_owned()));
    }

    /// Answer every `POST`, `PUT` and `DELETE` with `status` and `message`.
    pub fn fail_mutations_with(&self, status: u16, message: &str) {
        self.state.lock().failed_mutations = Some((status, message.to_owned()));
    }

    /// Reject the token of every authenticated request with 401.
    ///
    /// The first `count` requests are held until all of them have arrived, so
    /// that requests sent at the same time all fail together.
    pub fn reject_tokens_after(&self, count: usize) {
        self.state.lock().reject_tokens_after = Some(count);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn count_requests(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub fn last_request(&self, method: &str) -> Option<RecordedRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|request| request.method == method)
            .cloned()
    }
}

fn error_response(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(json!({ "statusCode": status.as_u16(), "message": message })),
    )
        .into_response()
}

fn account_from_payload(id: AccountId, payload: AccountPayload, image: Option<String>) -> Account {
    Account {
        id,
        name: payload.name,
        kind: payload.kind,
        description: payload.description,
        bank_info: payload.bank_info.map(|info| BankInfo {
            account_id: info.account_id,
            bank_id: info.bank_id,
            ..Default::default()
        }),
        show_in_dashboard_summary: payload.show_in_dashboard_summary,
        hide_from_reports: payload.hide_from_reports,
        opening_date: payload.opening_date,
        closing_date: payload.closing_date,
        ignore_unprocessed_before: payload.ignore_unprocessed_before,
        image,
        audit: Default::default(),
    }
}

async fn handle(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let path = uri.path().to_owned();

    state.lock().requests.push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        authorization: authorization.clone(),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let Some(route) = path.strip_prefix("/v1/") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let segments: Vec<&str> = route.split('/').collect();

    if segments == ["authorize"] && method == Method::POST {
        return authorize(&body);
    }

    if authorization.as_deref() != Some(&format!("Bearer {}", FakeBackend::TOKEN)) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let reject_after = state.lock().reject_tokens_after;
    if let Some(count) = reject_after {
        state.arrived.send_modify(|arrived| *arrived += 1);
        let mut arrived = state.arrived.subscribe();
        let _ = arrived.wait_for(|arrived| *arrived >= count).await;

        return StatusCode::UNAUTHORIZED.into_response();
    }

    let failure = if method == Method::GET {
        state.lock().failed_reads.clone()
    } else {
        state.lock().failed_mutations.clone()
    };
    if let Some((status, message)) = failure {
        return error_response(status, &message);
    }

    let mut data = state.lock();

    match (method, segments.as_slice()) {
        (Method::GET, ["accounts"]) => Json(data.accounts.clone()).into_response(),
        (Method::GET, ["currencies"]) => Json(data.currencies.clone()).into_response(),
        (Method::GET, ["accounts", id]) => {
            match data.accounts.iter().find(|account| account.id.as_str() == *id) {
                Some(account) => Json(account.clone()).into_response(),
                None => error_response(404, "Account not found"),
            }
        }
        (Method::POST, ["accounts"]) => {
            let Ok(payload) = serde_json::from_slice::<AccountPayload>(&body) else {
                return error_response(400, "Invalid account");
            };
            data.next_account += 1;
            let id = AccountId::new(format!("acc-{}", data.next_account));
            let account = account_from_payload(id, payload, None);
            data.accounts.push(account.clone());

            (StatusCode::CREATED, Json(account)).into_response()
        }
        (Method::PUT, ["accounts", id]) => {
            let Ok(payload) = serde_json::from_slice::<AccountPayload>(&body) else {
                return error_response(400, "Invalid account");
            };
            let Some(account) = data
                .accounts
                .iter_mut()
                .find(|account| account.id.as_str() == *id)
            else {
                return error_response(404, "Account not found");
            };
            *account = account_from_payload(account.id.clone(), payload, account.image.clone());

            Json(account.clone()).into_response()
        }
        (Method::DELETE, ["accounts", id]) => {
            let count = data.accounts.len();
            data.accounts.retain(|account| account.id.as_str() != *id);

            if data.accounts.len() == count {
                error_response(404, "Account not found")
            } else {
                StatusCode::NO_CONTENT.into_response()
            }
        }
        (method, ["accounts", id, "image"]) if method == Method::POST || method == Method::DELETE => {
            let Some(account) = data
                .accounts
                .iter_mut()
                .find(|account| account.id.as_str() == *id)
            else {
                return error_response(404, "Account not found");
            };
            account.image = (method == Method::POST).then(|| format!("/images/{id}.png"));

            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn authorize(body: &[u8]) -> Response {
    match serde_json::from_slice::<Credentials>(body) {
        Ok(credentials)
            if credentials.username == FakeBackend::USERNAME
                && credentials.password == FakeBackend::PASSWORD =>
        {
            Json(json!({ "token": FakeBackend::TOKEN })).into_response()
        }
        Ok(_) => error_response(401, "Unauthorized"),
        Err(_) => error_response(400, "username and password are required"),
    }
}
