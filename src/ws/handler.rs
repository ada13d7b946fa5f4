//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws/chat` — Upgrade HTTP connection to a chat session.
#[utoipa::path(
    get,
    path = "/ws/chat",
    tag = "Chat",
    summary = "Open a chat session",
    description = "Upgrades to a WebSocket. The first frame must be \
                   `{\"type\":\"auth\",\"token\":...}`; afterwards `send` and `get` \
                   frames are accepted and live messages arrive as `push` frames.",
    responses(
        (status = 101, description = "Switching protocols"),
        (status = 400, description = "Not a WebSocket upgrade request"),
    )
)]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state))
}
