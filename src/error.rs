//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert,
    api::{AccountId, ApiError, GENERIC_ERROR_MESSAGE},
    internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The backend rejected the session's bearer token.
    #[error("the session has expired")]
    SessionExpired,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has not been deleted.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The backend refused a request. `message` is shown to the user.
    #[error("the backend rejected the request with status {status}: {message}")]
    BackendRejected { status: u16, message: String },

    /// The backend could not be reached.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not reach the backend: {0}")]
    BackendUnavailable(String),

    /// The backend answered with something that is not the expected JSON.
    #[error("invalid response from the backend: {0}")]
    InvalidBackendResponse(String),

    /// The configured backend URL is not a valid http(s) URL.
    #[error("invalid backend URL \"{0}\"")]
    InvalidBackendUrl(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The replacement chosen for a deleted account is not one of the other accounts.
    #[error("account {0} cannot be used as the replacement account")]
    InvalidReplacement(AccountId),

    /// The same request for the same account is already being processed.
    #[error("an identical request is already in progress")]
    RequestInFlight,

    /// The uploaded file does not have an image content type.
    #[error("the file with content type \"{0}\" is not an image")]
    NotAnImage(String),

    /// The uploaded file is larger than the configured limit.
    #[error("the image is larger than {limit} bytes")]
    ImageTooLarge { limit: usize },

    /// An image upload was requested before a file was selected.
    #[error("no image has been selected for upload")]
    NoStagedImage,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),
}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Unauthorized => Error::SessionExpired,
            ApiError::NotFound => Error::NotFound,
            ApiError::Rejected { status, message } => Error::BackendRejected { status, message },
            ApiError::Transport(error) => Error::BackendUnavailable(error),
            ApiError::Decode(error) => Error::InvalidBackendResponse(error),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            // The auth middleware replaces this response with a redirect to the log-in page.
            Error::SessionExpired => StatusCode::UNAUTHORIZED.into_response(),
            Error::BackendUnavailable(error) | Error::InvalidBackendResponse(error) => {
                tracing::error!("Could not load data from the backend: {error}");
                (
                    StatusCode::BAD_GATEWAY,
                    InternalServerError {
                        description: "Could not load your data.",
                        fix: "The finance service is unavailable. Try again later.",
                    }
                    .into_html(),
                )
                    .into_response()
            }
            Error::BackendRejected { status, message } => {
                tracing::error!("The backend rejected a page request with status {status}: {message}");
                InternalServerError {
                    description: &message,
                    fix: "Try again later or check the server logs",
                }
                .into_response()
            }
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                Alert::ErrorSimple {
                    message: "Your session has expired. Please log in again.".to_owned(),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not find the account".to_owned(),
                    details: "The account could not be found. \
                    Try refreshing the page to see if it has already been deleted."
                        .to_owned(),
                },
            ),
            Error::BackendRejected { status, message } => {
                let status_code = StatusCode::from_u16(status)
                    .ok()
                    .filter(StatusCode::is_client_error)
                    .unwrap_or(StatusCode::BAD_GATEWAY);

                (status_code, Alert::ErrorSimple { message })
            }
            Error::BackendUnavailable(error) | Error::InvalidBackendResponse(error) => {
                tracing::error!("Request to the backend failed: {error}");
                (
                    StatusCode::BAD_GATEWAY,
                    Alert::Error {
                        message: GENERIC_ERROR_MESSAGE.to_owned(),
                        details: "The finance service could not be reached. Try again later."
                            .to_owned(),
                    },
                )
            }
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::InvalidReplacement(account_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid replacement account".to_owned(),
                    details: format!(
                        "The account {account_id} cannot take over the transactions of the \
                        deleted account. Choose another account or none."
                    ),
                },
            ),
            Error::RequestInFlight => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Request already in progress".to_owned(),
                    details: "Wait for the current request to finish before trying again."
                        .to_owned(),
                },
            ),
            Error::NotAnImage(content_type) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "File is not an image".to_owned(),
                    details: format!(
                        "Files of type \"{content_type}\" cannot be used as an account image."
                    ),
                },
            ),
            Error::ImageTooLarge { limit } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Image is too large".to_owned(),
                    details: format!("Choose an image that is at most {} KiB.", limit / 1024),
                },
            ),
            Error::NoStagedImage => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "Select an image to upload first.".to_owned(),
                },
            ),
            Error::MultipartError(error) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not read the uploaded file".to_owned(),
                    details: error,
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: GENERIC_ERROR_MESSAGE.to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
