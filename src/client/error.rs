use serde_json::Value;
use thiserror::Error;

use crate::application::ErrorKind;

/// Failure of an API call, tagged by how the caller should react.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400/422; the message is meant to be shown as is
    #[error("{0}")]
    Validation(String),
    /// 401/403; the stored credential has been discarded
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    /// Transport failures, unexpected statuses and unreadable responses
    #[error("{0}")]
    Unknown(String),
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Validation => ApiError::Validation(message),
            ErrorKind::Auth => ApiError::Auth(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Unknown => ApiError::Unknown(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Auth(_) => ErrorKind::Auth,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::Auth(m)
            | ApiError::Conflict(m)
            | ApiError::NotFound(m)
            | ApiError::Unknown(m) => m,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Unknown(format!("Unexpected response from server: {err}"))
        } else {
            ApiError::Unknown(format!("Could not reach the server: {err}"))
        }
    }
}

/// Map a failed response to an [`ApiError`].
///
/// The message is taken from a JSON body's `message` field, then its `error`
/// field. A body that is not JSON is used as raw text. When nothing usable is
/// present the `fallback` is used.
pub fn decode_error(status: u16, body: &str, fallback: &str) -> ApiError {
    let body = body.trim();
    let message = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => ["message", "error"]
            .iter()
            .filter_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|text| !text.is_empty())
            .unwrap_or(fallback)
            .to_string(),
        Ok(_) => fallback.to_string(),
        Err(_) if !body.is_empty() => body.to_string(),
        Err(_) => fallback.to_string(),
    };
    ApiError::new(ErrorKind::from_status(status), message)
}
