//! Persisted direct message.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Identifier of a persisted message, assigned by the Message Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A direct message as stored by the Message Store.
///
/// Immutable once persisted except for `read`, which only ever goes from
/// `false` to `true`. The gateway never mutates it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// Sender.
    pub from_user_id: UserId,
    /// Recipient.
    pub to_user_id: UserId,
    /// Message body, stored exactly as sent.
    pub content: String,
    /// Whether the recipient has pulled this message.
    pub read: bool,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
