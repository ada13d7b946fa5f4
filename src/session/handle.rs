//! Shared reference to an authenticated session.

use std::sync::Arc;

use super::outbound::{OutboundQueue, PushOutcome};
use crate::domain::{MessageId, SessionId, UserIdentity};
use crate::error::GatewayError;
use crate::ws::messages::OutboundFrame;

/// What the registry stores for an online user.
///
/// Cloning is cheap. A handle only ever reaches its session through the
/// outbound queue; nothing holding a handle can write to the socket.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    identity: UserIdentity,
    outbound: Arc<OutboundQueue>,
}

impl SessionHandle {
    /// Creates a handle for an authenticated session.
    #[must_use]
    pub fn new(session_id: SessionId, identity: UserIdentity, outbound: Arc<OutboundQueue>) -> Self {
        Self {
            session_id,
            identity,
            outbound,
        }
    }

    /// Connection instance this handle points at.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// User the session authenticated as.
    #[must_use]
    pub const fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Queues a live notification of a new message. Never waits.
    pub fn deliver(&self, message_id: MessageId, from: &UserIdentity, content: &str) -> PushOutcome {
        self.outbound.push(OutboundFrame::Push {
            message_id,
            from: from.clone(),
            content: content.to_string(),
        })
    }

    /// Tells the session it has been replaced and closes it.
    ///
    /// The final `error` frame is flushed before the socket closes; the
    /// session's own loop observes the close and tears itself down.
    pub fn supersede(&self) {
        self.outbound
            .close_with(OutboundFrame::error(&GatewayError::Superseded));
    }

    /// Returns `true` once the session stopped accepting frames.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
