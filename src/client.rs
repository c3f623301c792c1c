//! Client struct definition
//!
//! Represents a connected anonymous client and its outbound channel.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client information
///
/// Immutable after construction. The registry owns the entry; the
/// matching engine and pairs share it through `Arc<Client>`.
#[derive(Debug)]
pub struct Client {
    /// Anonymous session identifier
    pub id: ClientId,
    /// Server → Client message channel, drained by the connection's write task
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, sender }
    }

    /// Send a message to this client
    ///
    /// Waits for buffer space if the peer is slow. Returns an error
    /// if the channel is closed (client disconnected).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Send a message without waiting for buffer space
    ///
    /// Fails with `SendError::Full` if the peer is not draining its channel.
    pub fn try_send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Check whether the connection's write task is still alive
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
