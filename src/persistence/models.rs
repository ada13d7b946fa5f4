//! Database row shapes and their conversion into domain types.

use chrono::{DateTime, Utc};

use crate::domain::{ChatMessage, MessageId, UserId, UserIdentity};

/// Row of the `messages` table as selected by the backend.
pub type MessageRow = (i64, i64, i64, String, bool, DateTime<Utc>);

/// Row of the `users` table as selected by the backend.
pub type UserRow = (i64, String);

/// Converts a [`MessageRow`] into a [`ChatMessage`].
#[must_use]
pub fn message_from_row(row: MessageRow) -> ChatMessage {
    let (id, from_user_id, to_user_id, content, read, created_at) = row;
    ChatMessage {
        id: MessageId::new(id),
        from_user_id: UserId::new(from_user_id),
        to_user_id: UserId::new(to_user_id),
        content,
        read,
        created_at,
    }
}

/// Converts a [`UserRow`] into a [`UserIdentity`].
#[must_use]
pub fn identity_from_row(row: UserRow) -> UserIdentity {
    let (id, username) = row;
    UserIdentity::new(UserId::new(id), username)
}

/// A freshly created account and its bearer token.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Resolved identity of the new user.
    pub identity: UserIdentity,
    /// Opaque token to present in `auth` frames.
    pub token: String,
}
