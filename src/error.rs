//! Error types for the chat server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ClientId, PairId};

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (sent back to the client as an `error` payload).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Client asked for a match while already paired
    #[error("Already in chat")]
    AlreadyInChat,

    /// Client is not part of any active pair
    #[error("Not in chat")]
    NotInChat,

    /// No pair with the given id in the directory
    #[error("Pair not found: {0}")]
    PairNotFound(PairId),

    /// Pair was ended while the operation was in flight
    #[error("Pair is not active: {0}")]
    PairInactive(PairId),

    /// Sender is not a participant of the pair
    #[error("Partner not found")]
    PartnerNotFound,

    /// No live connection registered for the user
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Writing to the client's connection failed
    #[error("Failed to deliver message to {0}")]
    DeliveryFailure(ClientId),

    /// Client input rejected before touching any state
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed or full channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The channel buffer is full (client is not draining)
    #[error("Channel full")]
    Full,
}
