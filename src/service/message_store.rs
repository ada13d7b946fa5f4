//! Message Store contract consumed by the gateway.

use async_trait::async_trait;

use crate::domain::{ChatMessage, MessageId, UserId};
use crate::error::GatewayError;

/// Durable storage for direct messages.
///
/// Persistence through this trait is the only delivery guarantee the
/// gateway gives; live pushes are layered on top.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug {
    /// Persists a new unread message and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] if the message was not stored.
    async fn append(
        &self,
        from: UserId,
        to: UserId,
        content: &str,
    ) -> Result<MessageId, GatewayError>;

    /// Lists unread messages addressed to `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] on query failure.
    async fn list_unread(&self, user: UserId) -> Result<Vec<ChatMessage>, GatewayError>;

    /// Marks the given messages read. An empty slice must not touch storage.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StoreFailure`] on update failure.
    async fn mark_read(&self, ids: &[MessageId]) -> Result<(), GatewayError>;
}
