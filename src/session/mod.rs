//! Session layer: outbound serialization and the connection registry.
//!
//! A session's socket has exactly one writer, the drain task behind its
//! [`OutboundQueue`]. Everyone else, including other sessions delivering
//! pushes, reaches it through a [`SessionHandle`] found in the
//! [`ConnectionRegistry`].

pub mod handle;
pub mod outbound;
pub mod registry;

pub use handle::SessionHandle;
pub use outbound::{OutboundQueue, PushOutcome, spawn_drain};
pub use registry::ConnectionRegistry;
