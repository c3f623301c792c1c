//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Wire names are camelCase
//! to match the browser client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{ClientId, PairId};

/// Client → Server message
///
/// Closed set of requests. Unknown `type` tags fail to decode.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Look for a random stranger
    FindMatch,
    /// Send a chat message to the current stranger
    SendMessage {
        /// Pair the client believes it is in
        #[serde(default)]
        pair_id: Option<PairId>,
        /// Message text, must be non-empty
        #[serde(default)]
        text: Option<String>,
    },
    /// Leave the current stranger and search again
    NextStranger,
    /// Leave the current stranger (or the queue) and stop searching
    StopChat,
    /// Typing indicator for the current stranger
    Typing,
}

/// Server → Client message
///
/// Every variant carries a timestamp. Chat and system notifications
/// also carry `userId` and `pairId`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Chat message from the stranger
    Message {
        text: String,
        user_id: ClientId,
        pair_id: PairId,
        timestamp: DateTime<Utc>,
    },
    /// A stranger was matched with the recipient
    StrangerJoined {
        user_id: ClientId,
        pair_id: PairId,
        timestamp: DateTime<Utc>,
    },
    /// The recipient's stranger left the pair
    StrangerLeft {
        user_id: ClientId,
        pair_id: PairId,
        timestamp: DateTime<Utc>,
    },
    /// Recipient was placed in the waiting queue
    Searching {
        user_id: ClientId,
        pair_id: PairId,
        timestamp: DateTime<Utc>,
    },
    /// The stranger is typing
    Typing {
        user_id: ClientId,
        pair_id: PairId,
        timestamp: DateTime<Utc>,
    },
    /// Request rejected
    Error {
        code: ErrorCode,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    /// Chat message authored by `sender` in `pair_id`
    pub fn chat(text: String, sender: ClientId, pair_id: PairId) -> Self {
        Self::Message {
            text,
            user_id: sender,
            pair_id,
            timestamp: Utc::now(),
        }
    }

    pub fn stranger_joined(recipient: ClientId, pair_id: PairId) -> Self {
        Self::StrangerJoined {
            user_id: recipient,
            pair_id,
            timestamp: Utc::now(),
        }
    }

    pub fn stranger_left(recipient: ClientId, pair_id: PairId) -> Self {
        Self::StrangerLeft {
            user_id: recipient,
            pair_id,
            timestamp: Utc::now(),
        }
    }

    pub fn searching(recipient: ClientId) -> Self {
        Self::Searching {
            user_id: recipient,
            pair_id: PairId::nil(),
            timestamp: Utc::now(),
        }
    }

    pub fn typing(typist: ClientId, pair_id: PairId) -> Self {
        Self::Typing {
            user_id: typist,
            pair_id,
            timestamp: Utc::now(),
        }
    }
}

/// Error codes for ServerMessage::Error
///
/// Represents different error scenarios that can be communicated to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AlreadyInChat,
    NotInChat,
    PairNotFound,
    PairInactive,
    PartnerNotFound,
    ClientNotFound,
    DeliveryFailure,
    ValidationError,
    /// Frame could not be decoded
    InvalidMessage,
    InternalError,
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let (code, message) = match &err {
            AppError::AlreadyInChat => (
                ErrorCode::AlreadyInChat,
                "You are already in an active chat".to_string(),
            ),
            AppError::NotInChat => (
                ErrorCode::NotInChat,
                "You are not in an active chat".to_string(),
            ),
            AppError::PairNotFound(_) => {
                (ErrorCode::PairNotFound, "Chat not found".to_string())
            }
            AppError::PairInactive(_) => {
                (ErrorCode::PairInactive, "Chat is not active".to_string())
            }
            AppError::PartnerNotFound => {
                (ErrorCode::PartnerNotFound, "Stranger not found".to_string())
            }
            AppError::ClientNotFound(_) => {
                (ErrorCode::ClientNotFound, "Client not found".to_string())
            }
            AppError::DeliveryFailure(_) => (
                ErrorCode::DeliveryFailure,
                "Failed to send message".to_string(),
            ),
            AppError::Validation(reason) => (ErrorCode::ValidationError, reason.clone()),
            AppError::Json(e) => (
                ErrorCode::InvalidMessage,
                format!("Invalid message format: {}", e),
            ),
            // Fatal errors are not typically converted (connection closes)
            _ => (ErrorCode::InternalError, "Internal error".to_string()),
        };
        ServerMessage::Error {
            code,
            message,
            timestamp: Utc::now(),
        }
    }
}
