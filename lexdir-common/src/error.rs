//! Common error types for Lexdir

use thiserror::Error;

/// Common result type for Lexdir operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the API service and maintenance tooling
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Outbound provider call failed (CMS, search index, email, payments)
    #[error("Remote service error: {0}")]
    Remote(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
