//! lexdir-api library - HTTP service for the law-firm directory portal
//!
//! Exposes the router and application state so integration tests can drive
//! the service without binding a socket.

use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use api::build_router;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}
