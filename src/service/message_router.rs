//! Message router: persist first, then deliver live if the recipient is
//! online.

use std::sync::Arc;

use crate::domain::{ChatMessage, MessageId, UserId, UserIdentity};
use crate::error::GatewayError;
use crate::service::{IdentityService, MessageStore};
use crate::session::{ConnectionRegistry, PushOutcome};

/// Outcome of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    /// Identifier of the persisted message.
    pub message_id: MessageId,
    /// Resolved recipient.
    pub recipient: UserId,
    /// Whether a push was queued on a live recipient session.
    pub delivered_live: bool,
}

/// Routes outgoing chat messages and serves pulls.
///
/// Every send follows: validate → resolve recipient → persist → look up
/// recipient session → queue push. Persistence is the only durability
/// guarantee; a missed push never rolls it back.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn MessageStore>,
    registry: Arc<ConnectionRegistry>,
}

impl MessageRouter {
    /// Creates a new `MessageRouter`.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn MessageStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            identity,
            store,
            registry,
        }
    }

    /// Sends `content` from `sender` to the user named `to_user`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if `to_user` or `content` is blank;
    ///   nothing is looked up or stored.
    /// - [`GatewayError::NotFound`] if the recipient does not exist.
    /// - [`GatewayError::StoreFailure`] if the lookup or the append failed;
    ///   the message is not sent and nothing is pushed.
    pub async fn send(
        &self,
        sender: &UserIdentity,
        to_user: &str,
        content: &str,
    ) -> Result<SendReceipt, GatewayError> {
        let to_user = to_user.trim();
        if to_user.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "to_user must not be empty".to_string(),
            ));
        }
        if content.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "content must not be empty".to_string(),
            ));
        }

        let recipient = self
            .identity
            .resolve_username(to_user)
            .await?
            .ok_or_else(|| GatewayError::NotFound("recipient not found".to_string()))?;

        let message_id = self
            .store
            .append(sender.user_id, recipient.user_id, content)
            .await?;

        // Registry lock is released before touching the recipient's queue.
        let delivered_live = match self.registry.lookup(recipient.user_id).await {
            Some(session) => {
                let outcome = session.deliver(message_id, sender, content);
                match outcome {
                    PushOutcome::Queued => {}
                    PushOutcome::DisplacedOldest => tracing::warn!(
                        user_id = %recipient.user_id,
                        "recipient queue full, dropped oldest push"
                    ),
                    PushOutcome::Dropped | PushOutcome::Closed => tracing::debug!(
                        user_id = %recipient.user_id,
                        ?outcome,
                        "live delivery skipped, message stays pullable"
                    ),
                }
                outcome.is_queued()
            }
            None => false,
        };

        tracing::info!(
            from = %sender.user_id,
            to = %recipient.user_id,
            %message_id,
            delivered_live,
            "message routed"
        );

        Ok(SendReceipt {
            message_id,
            recipient: recipient.user_id,
            delivered_live,
        })
    }

    /// Returns unread messages for `user` and marks exactly those read.
    ///
    /// The returned messages carry their new read state.
    /// With nothing unread the store is not written to.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] if listing or marking fails;
    /// in that case the messages stay unread.
    pub async fn pull(&self, user: &UserIdentity) -> Result<Vec<ChatMessage>, GatewayError> {
        let messages = self.store.list_unread(user.user_id).await?;
        if messages.is_empty() {
            return Ok(messages);
        }

        let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
        self.store.mark_read(&ids).await?;

        tracing::debug!(user_id = %user.user_id, count = messages.len(), "unread messages pulled");
        Ok(messages
            .into_iter()
            .map(|mut message| {
                message.read = true;
                message
            })
            .collect())
    }
}
