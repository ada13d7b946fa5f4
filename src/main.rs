//! courier-gateway server entry point.
//!
//! Opens the SQLite store and serves the WebSocket chat endpoint.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use courier_gateway::api;
use courier_gateway::app_state::{AppState, SessionSettings};
use courier_gateway::config::{GatewayConfig, LogFormat};
use courier_gateway::persistence::SqliteBackend;
use courier_gateway::service::{IdentityService, MessageStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting courier-gateway");

    // Open storage; one backend serves both identity and messages
    let backend = Arc::new(
        SqliteBackend::connect(&config)
            .await
            .context("failed to open database")?,
    );

    // Build application state
    let identity: Arc<dyn IdentityService> = Arc::clone(&backend) as Arc<dyn IdentityService>;
    let store: Arc<dyn MessageStore> = backend;
    let app_state = AppState::new(SessionSettings::from(&config), identity, store);

    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
