// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// Domain failures (insufficient balance, full quota, double submission,
/// incomplete answer sets) are distinct variants with stable `code` strings so
/// clients can render the exact reason instead of a generic message.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error (storage and other unexpected failures)
    InternalServerError(String),

    // 400 Bad Request (validation failures, caught before any write)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (caller is not the owner of the resource)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (duplicate email, lifecycle misuse)
    Conflict(String),

    // 409: publish/withdraw would push a balance below zero
    InsufficientBalance(String),

    // 409: survey already has `target_respondents` submitted responses
    QuotaFull,

    // 409: this user already submitted a response for this survey
    AlreadySubmitted,

    // 400: an answer is missing or has the wrong shape for its question
    IncompleteAnswers { question_id: i64, reason: String },
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
        let (status, code, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::InsufficientBalance(msg) => {
                (StatusCode::CONFLICT, "insufficient_balance", msg)
            }
            AppError::QuotaFull => (
                StatusCode::CONFLICT,
                "quota_full",
                "Survey has reached its respondent quota".to_string(),
            ),
            AppError::AlreadySubmitted => (
                StatusCode::CONFLICT,
                "already_submitted",
                "You have already submitted a response for this survey".to_string(),
            ),
            AppError::IncompleteAnswers {
                question_id,
                reason,
            } => (
                StatusCode::BAD_REQUEST,
                "incomplete_answers",
                format!("Question {}: {}", question_id, reason),
            ),
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
