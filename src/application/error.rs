use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ExpenseId, ParticipantId, TripId, ValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Trip not found with id: {0}")]
    TripNotFound(TripId),

    #[error("Participant not found with id: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Expense not found with id: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Email is already in use")]
    EmailInUse(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("You do not own this trip")]
    Forbidden(TripId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Client-observable error taxonomy shared by the server and the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 400: the user can correct the input; message is shown verbatim
    Validation,
    /// 401/403: the credential is missing, expired or not allowed
    Auth,
    /// 409
    Conflict,
    /// 404
    NotFound,
    /// anything else, including transport failures
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unknown => "unknown",
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::Validation,
            401 | 403 => ErrorKind::Auth,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            _ => ErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::TripNotFound(_)
            | AppError::ParticipantNotFound(_)
            | AppError::ExpenseNotFound(_) => ErrorKind::NotFound,
            AppError::EmailInUse(_) => ErrorKind::Conflict,
            AppError::InvalidCredentials | AppError::Unauthorized(_) | AppError::Forbidden(_) => {
                ErrorKind::Auth
            }
            AppError::Database(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Forbidden(_) => 403,
            AppError::Database(_) => 500,
            other => match other.kind() {
                ErrorKind::Validation => 400,
                ErrorKind::Auth => 401,
                ErrorKind::NotFound => 404,
                ErrorKind::Conflict => 409,
                ErrorKind::Unknown => 500,
            },
        }
    }
}
