//! Domain layer: identifiers, identities and persisted messages.
//!
//! These are the plain data units the gateway passes between the
//! Identity Service, the Message Store and connected sessions.

pub mod chat_message;
pub mod identity;
pub mod user_id;

pub use chat_message::{ChatMessage, MessageId};
pub use identity::UserIdentity;
pub use user_id::{SessionId, UserId};
