//! # Lexdir Common Library
//!
//! Shared code for the Lexdir law-firm directory backend:
//! - Error taxonomy
//! - Configuration and root folder resolution
//! - Database initialization and migrations
//! - Role/status enums and authorization policy
//! - Password hashing and session token generation

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod roles;

pub use error::{Error, Result};
pub use roles::{Role, UserStatus};
