use serde_json::Value;

/// The message shown when the backend does not explain a failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// The ways a call to the backend can fail.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ApiError {
    /// The backend rejected the bearer token (HTTP 401).
    #[error("the backend rejected the session token")]
    Unauthorized,

    /// The backend answered HTTP 404.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The backend answered with any other non-success status.
    ///
    /// `message` is the backend's own explanation, or [GENERIC_ERROR_MESSAGE].
    #[error("the backend rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never completed, e.g. the backend is down.
    #[error("could not reach the backend: {0}")]
    Transport(String),

    /// The backend answered with a body that could not be parsed.
    #[error("could not decode the backend response: {0}")]
    Decode(String),
}

/// Extract the human readable message from an error response body.
///
/// The backend reports errors as JSON objects with a `message` (or `error`)
/// string. Anything else falls back to [GENERIC_ERROR_MESSAGE].
pub fn extract_error_message(body: &str) -> String {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) else {
        return GENERIC_ERROR_MESSAGE.to_owned();
    };

    ["message", "error"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| match value {
            Value::String(message) if !message.trim().is_empty() => Some(message.trim().to_owned()),
            Value::Array(messages) => messages
                .iter()
                .filter_map(Value::as_str)
                .next()
                .map(str::to_owned),
            _ => None,
        })
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{GENERIC_ERROR_MESSAGE, extract_error_message};

    #[test]
    fn uses_message_field() {
        let message = extract_error_message(r#"{"statusCode":400,"message":"Name taken"}"#);

        assert_eq!(message, "Name taken");
    }

    #[test]
    fn uses_first_message_of_a_list() {
        let message = extract_error_message(r#"{"message":["name should not be empty"]}"#);

        assert_eq!(message, "name should not be empty");
    }

    #[test]
    fn falls_back_to_error_field() {
        let message = extract_error_message(r#"{"error":"Bad Request"}"#);

        assert_eq!(message, "Bad Request");
    }

    #[test]
    fn falls_back_to_generic_message() {
        assert_eq!(extract_error_message(""), GENERIC_ERROR_MESSAGE);
        assert_eq!(extract_error_message("<html>502</html>"), GENERIC_ERROR_MESSAGE);
        assert_eq!(extract_error_message(r#"{"message":""}"#), GENERIC_ERROR_MESSAGE);
    }
}
