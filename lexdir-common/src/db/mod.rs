//! Database initialization and migrations
//!
//! The SQLite database is the authoritative store; the CMS and search index
//! only ever hold denormalized copies pushed by the sync service.

pub mod init;
pub mod migrations;

pub use init::{init_database, init_schema};
