//! Error types for Kindred
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! The realtime gateway reports the same variants as `error` events.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Every variant except the store failures is a caller-visible,
/// recoverable outcome of a single operation.
#[derive(Debug, Error)]
pub enum AppError {
    /// No identity presented (401)
    #[error("Authentication required")]
    Unauthenticated,

    /// Acting on another user's request or an unconnected conversation (403)
    #[error("Not allowed to act on this resource")]
    Unauthorized,

    /// Unknown request, user or conversation (404)
    #[error("Resource not found")]
    NotFound,

    /// A request already exists between the two users (409)
    #[error("A connection request already exists between these users")]
    DuplicateRequest,

    /// Reviewing a request that is no longer pending (409)
    #[error("Connection request is not pending")]
    InvalidTransition,

    /// Sending a request to oneself (400)
    #[error("Cannot send a connection request to yourself")]
    SelfRequest,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store temporarily unavailable (503), safe to retry
    #[error("Store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind, shared by HTTP bodies, websocket
    /// error events and the error metric.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Unauthorized => "unauthorized",
            AppError::NotFound => "not_found",
            AppError::DuplicateRequest => "duplicate_request",
            AppError::InvalidTransition => "invalid_transition",
            AppError::SelfRequest => "self_request",
            AppError::Validation(_) => "validation",
            AppError::Unavailable(_) => "unavailable",
            AppError::Database(_) => "database",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether the failure is transient and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateRequest | AppError::InvalidTransition => StatusCode::CONFLICT,
            AppError::SelfRequest | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to clients; store internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Config(_) | AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// SQLite primary result codes for a locked or busy database.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

fn is_transient_sqlx_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i64>().ok())
            // extended result codes carry the primary code in the low byte
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient_sqlx_error(&err) {
            AppError::Unavailable(err)
        } else {
            AppError::Database(err)
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status();
        let error_type = self.code();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": self.public_message(),
            "code": error_type,
        }));

        (status, body).into_response()
    }
}
