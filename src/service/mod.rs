//! Service layer: collaborator contracts and message routing.
//!
//! [`IdentityService`] and [`MessageStore`] are the external collaborators
//! the gateway consumes; [`MessageRouter`] coordinates them with the
//! [`crate::session::ConnectionRegistry`].

pub mod identity;
pub mod message_router;
pub mod message_store;

pub use identity::IdentityService;
pub use message_router::{MessageRouter, SendReceipt};
pub use message_store::MessageStore;
