//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::service::{IdentityService, MessageRouter, MessageStore};
use crate::session::ConnectionRegistry;

/// Per-session tuning taken from [`GatewayConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Bound of each outbound queue.
    pub outbound_queue_capacity: usize,
    /// How long teardown waits for the drain task to flush.
    pub drain_timeout: Duration,
}

impl From<&GatewayConfig> for SessionSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            outbound_queue_capacity: config.outbound_queue_capacity,
            drain_timeout: config.session_drain_timeout(),
        }
    }
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Who is online.
    pub registry: Arc<ConnectionRegistry>,
    /// Token verification for `auth` frames.
    pub identity: Arc<dyn IdentityService>,
    /// Send and pull logic.
    pub router: Arc<MessageRouter>,
    /// Per-session tuning.
    pub settings: SessionSettings,
}

impl AppState {
    /// Wires the registry and router around the given collaborators.
    #[must_use]
    pub fn new(
        settings: SessionSettings,
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&identity),
            store,
            Arc::clone(&registry),
        ));
        Self {
            registry,
            identity,
            router,
            settings,
        }
    }
}
