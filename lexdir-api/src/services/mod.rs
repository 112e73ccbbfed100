//! Outbound integrations and domain services
//!
//! One client per provider boundary, each constructed only when its settings
//! are present. The reconciliation service, lead scorer and mailer sit on top
//! of the clients and the database modules.

pub mod algolia;
pub mod email;
pub mod lead_scorer;
pub mod mailer;
pub mod payments;
pub mod sync;
pub mod wordpress;
