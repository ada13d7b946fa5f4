//! WebSocket layer: the chat endpoint and its per-connection loop.
//!
//! The endpoint at `/ws/chat` carries JSON text frames in both directions.
//! Inbound `auth`, `send` and `get` frames are admitted by the handshake,
//! then routed; replies and live pushes leave through the session's
//! outbound queue.

pub mod connection;
pub mod handler;
pub mod handshake;
pub mod messages;
