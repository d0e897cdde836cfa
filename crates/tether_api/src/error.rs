use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum RelayApiError {
    MissingAccessToken,
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Unauthorized {
        message: String,
    },
    Serde(JsonError),
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
    detail: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
    code: Option<String>,
}

impl fmt::Display for RelayApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAccessToken => write!(f, "access token is required"),
            Self::InvalidHeader(value) => write!(f, "invalid header: {value}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Unauthorized { message } => {
                write!(
                    f,
                    "{message}: token refresh failed; reconnect and sign in again"
                )
            }
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for RelayApiError {}

impl From<reqwest::Error> for RelayApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for RelayApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extract a human-readable message from an error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        let nested = payload.error.and_then(|fields| {
            fields
                .message
                .filter(|message| !message.is_empty())
                .or(fields.code)
        });
        if let Some(message) = nested
            .or(payload.detail)
            .or(payload.message)
            .filter(|message| !message.is_empty())
        {
            return message;
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::parse_error_message;

    #[test]
    fn nested_error_message_wins() {
        let body = r#"{"error":{"message":"instance not found","code":"missing"}}"#;
        assert_eq!(
            parse_error_message(StatusCode::NOT_FOUND, body),
            "instance not found"
        );
    }

    #[test]
    fn detail_field_is_used_when_error_object_is_absent() {
        let body = r#"{"detail":"invalid cursor"}"#;
        assert_eq!(
            parse_error_message(StatusCode::BAD_REQUEST, body),
            "invalid cursor"
        );
    }

    #[test]
    fn empty_body_falls_back_to_canonical_reason() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, ""),
            "Bad Gateway"
        );
    }

    #[test]
    fn unparseable_body_is_returned_verbatim() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "upstream connect error"),
            "upstream connect error"
        );
    }
}
