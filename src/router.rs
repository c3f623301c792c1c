//! Client message router
//!
//! Decodes a type-tagged client frame and runs the matching request
//! handler against the matching engine and the hub. Business failures
//! are sent back to the requesting client as an `error` payload.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::hub::Hub;
use crate::matching::MatchingEngine;
use crate::message::{ClientMessage, ServerMessage};
use crate::types::PairId;

/// Dispatches client requests
#[derive(Clone)]
pub struct Router {
    hub: Hub,
}

impl Router {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    fn matching(&self) -> &MatchingEngine {
        self.hub.matching()
    }

    /// Handle one raw text frame from `client`
    ///
    /// Failures are logged and answered with an `error` payload. None of
    /// them close the connection.
    pub async fn dispatch(&self, client: &Arc<Client>, raw: &str) {
        let result = match serde_json::from_str::<ClientMessage>(raw) {
            Ok(msg) => self.handle_message(client, msg).await,
            Err(e) => Err(AppError::Json(e)),
        };

        if let Err(e) = result {
            warn!("Request from {} rejected: {}", client.id, e);
            let _ = client.send(e.into()).await;
        }
    }

    /// Process a single decoded request
    pub async fn handle_message(
        &self,
        client: &Arc<Client>,
        msg: ClientMessage,
    ) -> Result<(), AppError> {
        match msg {
            ClientMessage::FindMatch => self.handle_find_match(client).await,
            ClientMessage::SendMessage { pair_id, text } => {
                self.handle_send_message(client, pair_id, text).await
            }
            ClientMessage::NextStranger => self.handle_next_stranger(client).await,
            ClientMessage::StopChat => self.handle_stop_chat(client).await,
            ClientMessage::Typing => self.handle_typing(client).await,
        }
    }

    /// Handle a match request
    async fn handle_find_match(&self, client: &Arc<Client>) -> Result<(), AppError> {
        // An unregistered client must never re-enter the queue
        if self.hub.get_client(client.id).await.is_none() {
            return Err(AppError::ClientNotFound(client.id));
        }

        match self.matching().find_match(client.clone()).await? {
            None => {
                client
                    .send(ServerMessage::searching(client.id))
                    .await
                    .map_err(|_| AppError::DeliveryFailure(client.id))?;
            }
            Some(pair) => {
                if let Err(e) = self.hub.notify_stranger_joined(&pair).await {
                    warn!("Pair {} formed but not fully announced: {}", pair.id, e);
                }
            }
        }
        Ok(())
    }

    /// Handle a chat message
    async fn handle_send_message(
        &self,
        client: &Arc<Client>,
        pair_id: Option<PairId>,
        text: Option<String>,
    ) -> Result<(), AppError> {
        let text = match text {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Err(AppError::Validation("message text is required".to_string())),
        };

        let pair = self.matching().get_pair(client.id).await?;

        // A client that skipped may still send against its old pair
        if let Some(claimed) = pair_id {
            if claimed != pair.id {
                return Err(AppError::PairNotFound(claimed));
            }
        }

        let msg = ServerMessage::chat(text, client.id, pair.id);
        self.hub.send_message_to_pair(pair.id, msg, client.id).await
    }

    /// Handle skipping to the next stranger
    async fn handle_next_stranger(&self, client: &Arc<Client>) -> Result<(), AppError> {
        self.leave_current_pair(client).await;
        self.handle_find_match(client).await
    }

    /// Handle stopping the chat entirely
    async fn handle_stop_chat(&self, client: &Arc<Client>) -> Result<(), AppError> {
        self.leave_current_pair(client).await;
        if self.matching().remove_from_queue(client.id).await {
            info!("Client {} stopped searching", client.id);
        }
        Ok(())
    }

    /// Handle typing indicator
    async fn handle_typing(&self, client: &Arc<Client>) -> Result<(), AppError> {
        let pair = self.matching().get_pair(client.id).await?;
        let msg = ServerMessage::typing(client.id, pair.id);
        self.hub.send_message_to_pair(pair.id, msg, client.id).await
    }

    /// Helper: End the client's pair, if any, and tell the partner
    async fn leave_current_pair(&self, client: &Arc<Client>) {
        let Ok(pair) = self.matching().end_user_pair(client.id).await else {
            debug!("Client {} had no pair to leave", client.id);
            return;
        };

        if let Some(partner) = pair.get_partner(client.id) {
            if let Err(e) = self.hub.notify_stranger_left(partner.id, pair.id).await {
                warn!("Failed to notify {} of pair {} ending: {}", partner.id, pair.id, e);
            }
        }
    }
}
