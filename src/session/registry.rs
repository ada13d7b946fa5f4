//! Connection registry: who is online right now.
//!
//! [`ConnectionRegistry`] maps each user to at most one live
//! [`SessionHandle`]. The map is never exposed; it is only mutated through
//! [`register`](ConnectionRegistry::register) and
//! [`unregister`](ConnectionRegistry::unregister), and the lock is held only
//! for the map operation itself.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::SessionHandle;
use crate::domain::{SessionId, UserId};

/// Concurrency-safe mapping from user to active session.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<UserId, SessionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handle` as the session for its user.
    ///
    /// Returns the superseded handle if a different session was registered
    /// for the same user. Re-registering the same session returns `None`.
    pub async fn register(&self, handle: SessionHandle) -> Option<SessionHandle> {
        let user_id = handle.identity().user_id;
        let session_id = handle.session_id();
        let previous = self.sessions.write().await.insert(user_id, handle);
        previous.filter(|prev| prev.session_id() != session_id)
    }

    /// Removes the mapping for `user_id` only if it still points at
    /// `session_id`.
    ///
    /// Returns `true` if the mapping was removed. A superseded connection
    /// unregistering late leaves the newer session in place.
    pub async fn unregister(&self, user_id: UserId, session_id: SessionId) -> bool {
        let mut map = self.sessions.write().await;
        if map
            .get(&user_id)
            .is_some_and(|current| current.session_id() == session_id)
        {
            map.remove(&user_id);
            return true;
        }
        false
    }

    /// Returns the live session for `user_id`, if any.
    pub async fn lookup(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Number of users with a live session.
    pub async fn online_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::UserIdentity;
    use crate::session::OutboundQueue;

    fn handle_for(user: i64) -> SessionHandle {
        SessionHandle::new(
            SessionId::new(),
            UserIdentity::new(UserId::new(user), format!("user{user}")),
            Arc::new(OutboundQueue::new(4)),
        )
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let handle = handle_for(1);
        let sid = handle.session_id();

        assert!(registry.register(handle).await.is_none());
        let Some(found) = registry.lookup(UserId::new(1)).await else {
            panic!("expected a session");
        };
        assert_eq!(found.session_id(), sid);
        assert!(registry.lookup(UserId::new(2)).await.is_none());
        assert_eq!(registry.online_count().await, 1);
    }

    #[tokio::test]
    async fn second_session_replaces_first() {
        let registry = ConnectionRegistry::new();
        let first = handle_for(1);
        let second = handle_for(1);
        let (first_id, second_id) = (first.session_id(), second.session_id());

        assert!(registry.register(first).await.is_none());
        let Some(superseded) = registry.register(second).await else {
            panic!("expected the first session back");
        };
        assert_eq!(superseded.session_id(), first_id);

        let Some(found) = registry.lookup(UserId::new(1)).await else {
            panic!("expected a session");
        };
        assert_eq!(found.session_id(), second_id);
        assert_eq!(registry.online_count().await, 1);
    }

    #[tokio::test]
    async fn reregistering_same_session_supersedes_nothing() {
        let registry = ConnectionRegistry::new();
        let handle = handle_for(1);
        assert!(registry.register(handle.clone()).await.is_none());
        assert!(registry.register(handle).await.is_none());
    }

    #[tokio::test]
    async fn stale_unregister_keeps_newer_session() {
        let registry = ConnectionRegistry::new();
        let first = handle_for(1);
        let second = handle_for(1);
        let (first_id, second_id) = (first.session_id(), second.session_id());
        registry.register(first).await;
        registry.register(second).await;

        assert!(!registry.unregister(UserId::new(1), first_id).await);
        assert!(registry.lookup(UserId::new(1)).await.is_some());

        assert!(registry.unregister(UserId::new(1), second_id).await);
        assert!(registry.lookup(UserId::new(1)).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_registrations_keep_one_session_per_user() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();
        for user in 0..16_i64 {
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                tasks.push(tokio::spawn(async move {
                    registry.register(handle_for(user)).await;
                }));
            }
        }
        for task in tasks {
            assert!(task.await.is_ok());
        }
        assert_eq!(registry.online_count().await, 16);
    }
}
