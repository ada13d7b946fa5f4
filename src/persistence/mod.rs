//! Persistence layer: SQLite-backed identity lookups and message storage.
//!
//! [`SqliteBackend`] implements both collaborator traits the gateway
//! consumes, [`crate::service::IdentityService`] and
//! [`crate::service::MessageStore`], over one `sqlx::SqlitePool`.

pub mod models;
pub mod sqlite;

pub use models::NewAccount;
pub use sqlite::SqliteBackend;
