//! Type-safe user and session identifiers.
//!
//! [`UserId`] wraps the Identity Service's integer key so it cannot be
//! confused with a [`super::MessageId`]. [`SessionId`] wraps a UUID v4 and
//! identifies one connection instance, which is what the registry compares
//! when a superseded connection tries to unregister.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a user account, as issued by the Identity Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
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

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Identifier of one live connection.
///
/// Generated when the WebSocket is accepted and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random `SessionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn user_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId::new(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = UserId::new(3);
        let mut map = HashMap::new();
        map.insert(id, "alice");
        assert_eq!(map.get(&UserId::from(3)), Some(&"alice"));
    }
}
