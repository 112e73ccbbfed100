//! Database access modules
//!
//! One module per table. All queries are explicit and parameterized; no query
//! builder layer.

pub mod branches;
pub mod email_prefs;
pub mod firms;
pub mod leads;
pub mod notifications;
pub mod ownership;
pub mod sessions;
pub mod users;
