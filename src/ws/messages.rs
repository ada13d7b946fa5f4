//! WebSocket wire types: inbound commands and outbound frames.
//!
//! Inbound frames are JSON objects tagged by `type`:
//! `{"type":"auth","token":..}`, `{"type":"send","to_user":..,"content":..}`
//! and `{"type":"get"}`.
//!
//! Every outbound frame is a [`WsResponse`]:
//! `{"type":..,"success":..,"message":..,"data":..}`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{ChatMessage, MessageId, UserIdentity};
use crate::error::{ErrorKind, GatewayError};

/// Commands a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Authenticate the session with a bearer token.
    Auth {
        /// Token issued by the Identity Service.
        token: String,
    },
    /// Send a direct message.
    Send {
        /// Recipient username.
        #[serde(default)]
        to_user: String,
        /// Message body.
        #[serde(default)]
        content: String,
    },
    /// Fetch unread messages and mark them read.
    #[serde(rename = "get")]
    Pull,
}

impl InboundFrame {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ProtocolViolation`] for malformed JSON, an
    /// unknown `type`, or missing required fields.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(text)
            .map_err(|err| GatewayError::ProtocolViolation(format!("malformed frame: {err}")))
    }

    /// Wire name of the frame type, for logging.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Send { .. } => "send",
            Self::Pull => "get",
        }
    }
}

/// Discriminator for outbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundType {
    /// Answer to `auth`.
    AuthResult,
    /// Answer to `send`.
    SendAck,
    /// Answer to `get`.
    PullResult,
    /// Server-initiated notification of a new message.
    Push,
    /// Failure of the preceding command, or a session-level notice.
    Error,
}

/// Error payload carried by failed frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFrame {
    /// Taxonomy kind.
    pub kind: ErrorKind,
    /// Numeric code.
    pub code: u32,
    /// Client-safe message.
    pub message: String,
}

impl ErrorFrame {
    /// Builds the client-facing view of `err`.
    #[must_use]
    pub fn from_error(err: &GatewayError) -> Self {
        Self {
            kind: err.kind(),
            code: err.error_code(),
            message: err.client_message(),
        }
    }

    /// Replaces the message, keeping kind and code.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// A frame queued for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Authentication succeeded.
    AuthResult(UserIdentity),
    /// Authentication failed; the session state is unchanged.
    AuthRejected(ErrorFrame),
    /// The message was persisted.
    SendAck {
        /// Identifier of the persisted message.
        message_id: MessageId,
        /// Whether a push was queued for the recipient.
        delivered_live: bool,
    },
    /// Unread messages, now marked read.
    PullResult(Vec<ChatMessage>),
    /// A new message for the session's user.
    Push {
        /// Identifier of the persisted message.
        message_id: MessageId,
        /// Sender.
        from: UserIdentity,
        /// Message body.
        content: String,
    },
    /// The preceding command failed, or the session is being closed.
    Error(ErrorFrame),
}

impl OutboundFrame {
    /// Shorthand for an [`OutboundFrame::Error`] built from `err`.
    #[must_use]
    pub fn error(err: &GatewayError) -> Self {
        Self::Error(ErrorFrame::from_error(err))
    }

    /// Converts the frame into its wire envelope.
    #[must_use]
    pub fn to_response(&self) -> WsResponse {
        match self {
            Self::AuthResult(identity) => WsResponse::ok(
                OutboundType::AuthResult,
                "authenticated",
                Some(json!({
                    "user_id": identity.user_id,
                    "username": identity.username,
                })),
            ),
            Self::AuthRejected(err) => WsResponse::failed(OutboundType::AuthResult, err),
            Self::SendAck {
                message_id,
                delivered_live,
            } => WsResponse::ok(
                OutboundType::SendAck,
                "message sent",
                Some(json!({
                    "message_id": message_id,
                    "delivered_live": delivered_live,
                })),
            ),
            Self::PullResult(messages) => WsResponse::ok(
                OutboundType::PullResult,
                "messages fetched",
                Some(json!({
                    "count": messages.len(),
                    "messages": messages,
                })),
            ),
            Self::Push {
                message_id,
                from,
                content,
            } => WsResponse::ok(
                OutboundType::Push,
                "new message",
                Some(json!({
                    "message_id": message_id,
                    "from_username": from.username,
                    "from_user_id": from.user_id,
                    "content": content,
                })),
            ),
            Self::Error(err) => WsResponse::failed(OutboundType::Error, err),
        }
    }

    /// Serializes the frame to the JSON text sent on the socket.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if serialization fails.
    pub fn to_json(&self) -> Result<String, GatewayError> {
        serde_json::to_string(&self.to_response())
            .map_err(|err| GatewayError::Internal(format!("encode outbound frame: {err}")))
    }
}

/// Outbound wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsResponse {
    /// Frame discriminator.
    #[serde(rename = "type")]
    pub frame_type: OutboundType,
    /// Whether the command succeeded.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
    /// Frame-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl WsResponse {
    fn ok(frame_type: OutboundType, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            frame_type,
            success: true,
            message: message.to_string(),
            data,
        }
    }

    fn failed(frame_type: OutboundType, err: &ErrorFrame) -> Self {
        Self {
            frame_type,
            success: false,
            message: err.message.clone(),
            data: Some(json!({
                "kind": err.kind,
                "code": err.code,
            })),
        }
    }
}
