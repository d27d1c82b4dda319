//! Error taxonomy shared by the session gate, the stores and the todo
//! operations, plus its translation into HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Why a request failed to authenticate. Never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no session token")]
    NoToken,
    #[error("invalid session token")]
    InvalidToken,
    #[error("session token expired")]
    Expired,
    #[error("session user not found")]
    UserNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    #[error("item belongs to another user")]
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Todo text must not be empty")]
    EmptyText,
    #[error("Invalid todo id")]
    InvalidId,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    ConnectionFailure(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::ConnectionFailure(e.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Malformed, mistyped or non-JSON bodies become a 400 with a JSON message.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::InvalidBody(rejection.body_text()).into()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
            // forbidden and missing look identical so foreign ids stay hidden
            AppError::Ownership(OwnershipError::Forbidden) | AppError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "Todo not found".into())
            }
            AppError::Validation(v) => (StatusCode::BAD_REQUEST, v.to_string()),
            AppError::Store(StoreError::Conflict) => {
                (StatusCode::CONFLICT, "Email already registered".into())
            }
            AppError::Store(StoreError::ConnectionFailure(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Service temporarily unavailable".into(),
            ),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".into()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Auth(kind) => warn!(reason = %kind, "request rejected by session gate"),
            AppError::Ownership(_) => warn!("cross-owner access rejected"),
            AppError::Store(StoreError::ConnectionFailure(e)) => error!(error = %e, "store failure"),
            AppError::Internal(e) => error!(error = ?e, "internal error"),
            _ => {}
        }

        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { message })).into_response()
    }
}
