//! Per-connection gateway loop.
//!
//! Each accepted WebSocket becomes one [`Session`]: a read loop owned by the
//! connection's task plus a drain task that is the socket's only writer.
//! Inbound frames go through the [`Handshake`] transition table and are then
//! dispatched to authentication, the [`crate::service::MessageRouter`], or
//! rejected. Teardown runs on every exit path.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, Stream, StreamExt};
use tokio::task::JoinHandle;

use super::handshake::{Action, Handshake};
use super::messages::{ErrorFrame, InboundFrame, OutboundFrame};
use crate::app_state::AppState;
use crate::domain::{SessionId, UserIdentity};
use crate::error::GatewayError;
use crate::session::{OutboundQueue, SessionHandle, spawn_drain};

/// Runs the gateway loop for an upgraded WebSocket.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    run_session(sink, stream, state).await;
}

/// Runs the gateway loop over any message sink/stream pair.
///
/// Returns once the peer closes, a read fails, or the session is closed
/// from elsewhere (superseded, or its writer failed).
pub async fn run_session<W, R, E>(sink: W, mut stream: R, state: AppState)
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut session = Session::open(sink, &state);
    tracing::debug!(session_id = %session.id, "connection opened");

    session.read_loop(&mut stream, &state).await;
    session.teardown(&state).await;
}

/// One connection's state, owned by its gateway loop.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    handshake: Handshake,
    outbound: Arc<OutboundQueue>,
    drain: JoinHandle<()>,
}

impl Session {
    /// Creates an unauthenticated session and starts its drain task.
    pub fn open<W>(sink: W, state: &AppState) -> Self
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display,
    {
        let id = SessionId::new();
        let outbound = Arc::new(OutboundQueue::new(state.settings.outbound_queue_capacity));
        let drain = spawn_drain(Arc::clone(&outbound), sink, id);
        Self {
            id,
            handshake: Handshake::new(),
            outbound,
            drain,
        }
    }

    /// Connection instance identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    async fn read_loop<R, E>(&mut self, stream: &mut R, state: &AppState)
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let outbound = Arc::clone(&self.outbound);
        loop {
            let inbound = tokio::select! {
                inbound = stream.next() => inbound,
                () = outbound.closed() => {
                    tracing::debug!(session_id = %self.id, "outbound closed, leaving read loop");
                    break;
                }
            };

            let keep_going = match inbound {
                Some(Ok(Message::Text(text))) => self.handle_text(text.as_str(), state).await,
                Some(Ok(Message::Binary(_))) => {
                    let err = GatewayError::ProtocolViolation("text frames only".to_string());
                    self.reply(OutboundFrame::error(&err)).await
                }
                Some(Ok(Message::Close(_))) | None => false,
                Some(Ok(_)) => true,
                Some(Err(err)) => {
                    tracing::debug!(session_id = %self.id, error = %err, "read failed");
                    false
                }
            };
            if !keep_going {
                break;
            }
        }
    }

    /// Handles one text frame. Returns `false` once the session can no
    /// longer be written to.
    async fn handle_text(&mut self, text: &str, state: &AppState) -> bool {
        let admitted = InboundFrame::parse(text).and_then(|frame| self.handshake.admit(frame));
        let action = match admitted {
            Ok(action) => action,
            Err(err) => {
                tracing::debug!(session_id = %self.id, error = %err, "frame rejected");
                return self.reply(OutboundFrame::error(&err)).await;
            }
        };

        match action {
            Action::Authenticate { token, current } => {
                self.authenticate(&token, current.as_ref(), state).await
            }
            Action::Send {
                sender,
                to_user,
                content,
            } => {
                let frame = match state.router.send(&sender, &to_user, &content).await {
                    Ok(receipt) => OutboundFrame::SendAck {
                        message_id: receipt.message_id,
                        delivered_live: receipt.delivered_live,
                    },
                    Err(err) => self.failure(&err, "delivery failed"),
                };
                self.reply(frame).await
            }
            Action::Pull(user) => {
                let frame = match state.router.pull(&user).await {
                    Ok(messages) => OutboundFrame::PullResult(messages),
                    Err(err) => self.failure(&err, "fetch failed"),
                };
                self.reply(frame).await
            }
        }
    }

    async fn authenticate(
        &mut self,
        token: &str,
        current: Option<&UserIdentity>,
        state: &AppState,
    ) -> bool {
        let token = token.trim();
        let verified = if token.is_empty() {
            Err(GatewayError::AuthFailure("missing token".to_string()))
        } else {
            match state.identity.verify_token(token).await {
                Ok(Some(identity)) => Ok(identity),
                Ok(None) => Err(GatewayError::AuthFailure("invalid token".to_string())),
                Err(err) => Err(err),
            }
        };

        let identity = match verified {
            Ok(identity) => identity,
            Err(err) => {
                if let GatewayError::StoreFailure(cause) = &err {
                    tracing::warn!(session_id = %self.id, error = %cause, "token verification failed");
                } else {
                    tracing::debug!(session_id = %self.id, "authentication rejected");
                }
                let frame = OutboundFrame::AuthRejected(ErrorFrame::from_error(&err));
                return self.reply(frame).await;
            }
        };

        let first = match self.handshake.authenticated(identity.clone()) {
            Ok(first) => first,
            Err(err) => return self.reply(OutboundFrame::error(&err)).await,
        };

        // The result goes out before registration so it precedes any push.
        if !self.reply(OutboundFrame::AuthResult(identity.clone())).await {
            return false;
        }

        let handle = SessionHandle::new(self.id, identity.clone(), Arc::clone(&self.outbound));
        if let Some(superseded) = state.registry.register(handle).await {
            superseded.supersede();
            tracing::info!(
                user_id = %identity.user_id,
                session_id = %self.id,
                superseded = %superseded.session_id(),
                "older session superseded"
            );
        }

        if first {
            tracing::info!(
                user_id = %identity.user_id,
                username = %identity.username,
                session_id = %self.id,
                "user authenticated"
            );
        } else {
            tracing::debug!(
                user_id = %identity.user_id,
                previous = ?current.map(|c| c.user_id),
                session_id = %self.id,
                "session re-authenticated"
            );
        }
        true
    }

    /// Error frame for a failed send or pull. Store causes are logged here
    /// and replaced by `store_message` on the wire.
    fn failure(&self, err: &GatewayError, store_message: &str) -> OutboundFrame {
        let frame = ErrorFrame::from_error(err);
        match err {
            GatewayError::StoreFailure(cause) => {
                tracing::warn!(session_id = %self.id, error = %cause, "{}", store_message);
                OutboundFrame::Error(frame.with_message(store_message))
            }
            _ => OutboundFrame::Error(frame),
        }
    }

    async fn reply(&self, frame: OutboundFrame) -> bool {
        self.outbound.enqueue_reply(frame).await.is_ok()
    }

    /// Unregisters (only if still current), stops the drain task and
    /// releases the socket.
    async fn teardown(mut self, state: &AppState) {
        if let Some(identity) = self.handshake.close()
            && state.registry.unregister(identity.user_id, self.id).await
        {
            tracing::info!(
                user_id = %identity.user_id,
                session_id = %self.id,
                "user disconnected"
            );
        }

        self.outbound.close();
        match tokio::time::timeout(state.settings.drain_timeout, &mut self.drain).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(session_id = %self.id, error = %err, "drain task failed");
            }
            Err(_) => {
                tracing::debug!(session_id = %self.id, "drain did not finish in time, aborting");
                self.drain.abort();
            }
        }
        tracing::debug!(session_id = %self.id, "connection closed");
    }
}
