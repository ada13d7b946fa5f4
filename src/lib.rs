//! # courier-gateway
//!
//! Real-time direct messaging gateway over WebSocket.
//!
//! Each connected user holds one long-lived session. A message sent to a
//! user who is online is persisted and pushed to their session at once; a
//! message to an offline user is only persisted and is returned by their
//! next `get`, which marks it read. Users and messages live in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket /ws/chat, HTTP /health)
//!     │
//!     ├── Router + layers (api/)
//!     ├── Gateway loop, handshake, frames (ws/)
//!     │
//!     ├── MessageRouter (service/)
//!     ├── ConnectionRegistry, OutboundQueue (session/)
//!     │
//!     ├── IdentityService, MessageStore (service/ traits)
//!     │
//!     └── SQLite persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod session;
pub mod ws;
