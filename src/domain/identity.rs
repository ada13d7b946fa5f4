//! Resolved user identity.

use serde::Serialize;

use super::UserId;

/// What the Identity Service resolves a token or username to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    /// Account identifier.
    pub user_id: UserId,
    /// Unique username, also used as the display name.
    pub username: String,
}

impl UserIdentity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
