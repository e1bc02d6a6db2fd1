// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use uuid::Uuid;

use crate::store::StoreError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (e.g., reading another user's attempt)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., lost a concurrent attempt start)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Failures of the attempt and reward engines.
///
/// Business-rule rejections are never retried; `Store` wraps anything the
/// storage layer could not complete.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Quiz {0} not found")]
    QuizNotFound(i64),

    #[error("Quiz attempt {0} not found")]
    AttemptNotFound(Uuid),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Maximum allowed attempts ({max_attempts}) reached for this quiz")]
    AttemptLimitExceeded { max_attempts: i32 },

    #[error("This quiz attempt has already been submitted")]
    AlreadySubmitted,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::QuizNotFound(_) | CoreError::AttemptNotFound(_) | CoreError::UserNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            CoreError::AttemptLimitExceeded { .. } | CoreError::AlreadySubmitted => {
                AppError::BadRequest(err.to_string())
            }
            CoreError::Conflict(msg) => AppError::Conflict(msg),
            CoreError::Store(StoreError::NotFound(what)) => {
                AppError::NotFound(format!("{} not found", what))
            }
            CoreError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::from(CoreError::Store(err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
