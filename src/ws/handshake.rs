//! Session handshake state machine.
//!
//! ```text
//! Unauthenticated ──auth ok──▶ Authenticated ──close──▶ Closed
//!        │  ▲                        │  ▲
//!        └──┘ auth failed,           └──┘ send, get, re-auth
//!             send/get rejected
//! ```
//!
//! States only move forward. [`Handshake::admit`] is the transition table:
//! it turns an inbound frame into the [`Action`] the current state allows,
//! before any I/O happens.

use crate::domain::UserIdentity;
use crate::error::GatewayError;
use crate::ws::messages::InboundFrame;

/// Lifecycle state of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected, no valid `auth` seen yet.
    #[default]
    Unauthenticated,
    /// Bound to a user and registered as online.
    Authenticated(UserIdentity),
    /// Terminal.
    Closed,
}

/// What the loop should do with an admitted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Verify the token; `current` is the identity already held on re-auth.
    Authenticate {
        /// Token to verify.
        token: String,
        /// Identity bound before this frame, if any.
        current: Option<UserIdentity>,
    },
    /// Hand the message to the router on behalf of `sender`.
    Send {
        /// Authenticated sender.
        sender: UserIdentity,
        /// Recipient username as given.
        to_user: String,
        /// Message body as given.
        content: String,
    },
    /// Fetch unread messages for this user.
    Pull(UserIdentity),
}

/// Forward-only state holder for one session.
#[derive(Debug, Default)]
pub struct Handshake {
    state: SessionState,
}

impl Handshake {
    /// Starts in [`SessionState::Unauthenticated`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Authenticated identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&UserIdentity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Decides what `frame` may do in the current state.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ProtocolViolation`] for `send`/`get` before
    /// authentication, and [`GatewayError::TransportFailure`] once closed.
    pub fn admit(&self, frame: InboundFrame) -> Result<Action, GatewayError> {
        match (&self.state, frame) {
            (SessionState::Closed, _) => {
                Err(GatewayError::TransportFailure("session closed".to_string()))
            }
            (SessionState::Unauthenticated, InboundFrame::Auth { token }) => {
                Ok(Action::Authenticate {
                    token,
                    current: None,
                })
            }
            (SessionState::Unauthenticated, InboundFrame::Send { .. } | InboundFrame::Pull) => Err(
                GatewayError::ProtocolViolation("authenticate first".to_string()),
            ),
            (SessionState::Authenticated(identity), InboundFrame::Auth { token }) => {
                Ok(Action::Authenticate {
                    token,
                    current: Some(identity.clone()),
                })
            }
            (SessionState::Authenticated(identity), InboundFrame::Send { to_user, content }) => {
                Ok(Action::Send {
                    sender: identity.clone(),
                    to_user,
                    content,
                })
            }
            (SessionState::Authenticated(identity), InboundFrame::Pull) => {
                Ok(Action::Pull(identity.clone()))
            }
        }
    }

    /// Records a successful token verification.
    ///
    /// Returns `true` if the session just left `Unauthenticated`. Verifying
    /// again as the same user keeps the state as is.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ProtocolViolation`] if the session is already
    /// bound to a different user, and [`GatewayError::TransportFailure`]
    /// once closed.
    pub fn authenticated(&mut self, identity: UserIdentity) -> Result<bool, GatewayError> {
        match &self.state {
            SessionState::Unauthenticated => {
                self.state = SessionState::Authenticated(identity);
                Ok(true)
            }
            SessionState::Authenticated(current) if current.user_id == identity.user_id => {
                Ok(false)
            }
            SessionState::Authenticated(_) => Err(GatewayError::ProtocolViolation(
                "session already authenticated as another user".to_string(),
            )),
            SessionState::Closed => {
                Err(GatewayError::TransportFailure("session closed".to_string()))
            }
        }
    }

    /// Moves to `Closed`, returning the identity the session held, if any.
    ///
    /// Closing twice returns `None` the second time.
    pub fn close(&mut self) -> Option<UserIdentity> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Authenticated(identity) => Some(identity),
            SessionState::Unauthenticated | SessionState::Closed => None,
        }
    }
}
