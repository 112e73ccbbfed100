//! Error types for lexdir-api
//!
//! `ApiError` is returned from HTTP handlers and maps onto the conventional
//! status codes. Internal details are logged server-side and never leaked in
//! 500 responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Handler error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request body or parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<lexdir_common::Error> for ApiError {
    fn from(err: lexdir_common::Error) -> Self {
        use lexdir_common::Error as E;
        match err {
            E::InvalidInput(msg) => ApiError::BadRequest(msg),
            E::Unauthorized(msg) => ApiError::Unauthorized(msg),
            E::Forbidden(msg) => ApiError::Forbidden(msg),
            E::NotFound(msg) => ApiError::NotFound(msg),
            E::Database(e) => ApiError::Database(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
