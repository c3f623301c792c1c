//! Connection registry (Hub)
//!
//! Owns the set of live clients, delivers messages to a single client's
//! connection, and performs the cascading cleanup when a client leaves.
//!
//! The registry lock guards only the client map. It is always released
//! before calling into the matching engine and before any channel send.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::matching::MatchingEngine;
use crate::message::ServerMessage;
use crate::pair::ChatPair;
use crate::types::{ClientId, PairId};

/// Default cap on concurrently running background notifications
pub const DEFAULT_NOTIFY_WORKERS: usize = 64;

/// Registry of live clients
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Hub {
    /// All connected clients: ClientId -> Client
    clients: Arc<RwLock<HashMap<ClientId, Arc<Client>>>>,
    matching: MatchingEngine,
    /// Permits for fire-and-forget notification tasks
    notify_permits: Arc<Semaphore>,
}

impl Hub {
    /// Create a hub around an existing matching engine
    pub fn new(matching: MatchingEngine) -> Self {
        Self::with_notify_workers(matching, DEFAULT_NOTIFY_WORKERS)
    }

    pub fn with_notify_workers(matching: MatchingEngine, notify_workers: usize) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            matching,
            notify_permits: Arc::new(Semaphore::new(notify_workers)),
        }
    }

    pub fn matching(&self) -> &MatchingEngine {
        &self.matching
    }

    /// Register a newly connected client
    pub async fn add_client(&self, client: Arc<Client>) {
        let id = client.id;
        let total = {
            let mut clients = self.clients.write().await;
            if clients.insert(id, client).is_some() {
                warn!("Client {} was already registered, replacing", id);
            }
            clients.len()
        };

        info!("Client {} added to hub", id);
        debug!("Total clients: {}", total);
    }

    /// Register a client unless its id is already live
    ///
    /// Returns false, leaving the existing registration alone, if the id
    /// is taken.
    pub async fn try_add_client(&self, client: Arc<Client>) -> bool {
        let id = client.id;
        let total = {
            let mut clients = self.clients.write().await;
            if clients.contains_key(&id) {
                return false;
            }
            clients.insert(id, client);
            clients.len()
        };

        info!("Client {} added to hub", id);
        debug!("Total clients: {}", total);
        true
    }

    /// Unregister a client and release everything it holds
    ///
    /// The client leaves the waiting queue and its pair (if any) is ended
    /// before this returns. The partner's `strangerLeft` notification runs
    /// on a background task and may arrive after this returns.
    pub async fn remove_client(&self, user_id: ClientId) {
        let removed = self.clients.write().await.remove(&user_id);
        if removed.is_none() {
            debug!("Client {} was not registered", user_id);
        }
        info!("Client {} removed from hub", user_id);

        // Dequeue first: any match that already popped this client is then
        // visible to end_user_pair below
        self.matching.remove_from_queue(user_id).await;

        if let Ok(pair) = self.matching.end_user_pair(user_id).await {
            if let Some(partner) = pair.get_partner(user_id) {
                self.spawn_stranger_left(partner.id, pair.id);
            }
        }

        debug!(
            "Waiting: {}, Active pairs: {}",
            self.matching.queue_size().await,
            self.matching.active_pairs_count().await
        );
    }

    /// Deliver a message from `sender_id` to the other participant of a pair
    pub async fn send_message_to_pair(
        &self,
        pair_id: PairId,
        message: ServerMessage,
        sender_id: ClientId,
    ) -> Result<(), AppError> {
        let pair = self.matching.get_pair_by_id(pair_id).await?;

        if !pair.is_active() {
            return Err(AppError::PairInactive(pair_id));
        }

        let partner = pair
            .get_partner(sender_id)
            .ok_or(AppError::PartnerNotFound)?;

        partner.send(message).await.map_err(|e| {
            warn!("Error sending message to client {}: {}", partner.id, e);
            AppError::DeliveryFailure(partner.id)
        })?;

        debug!(
            "Message sent from {} to {} in pair {}",
            sender_id, partner.id, pair_id
        );
        Ok(())
    }

    /// Tell both participants that they have been matched
    ///
    /// Tries both sides even if the first fails. A failure does not undo
    /// the pairing. Like `notify_stranger_left`, a client with a full
    /// buffer misses the notification rather than stalling the caller.
    pub async fn notify_stranger_joined(&self, pair: &ChatPair) -> Result<(), AppError> {
        let mut failed = None;

        for client in [&pair.first, &pair.second] {
            if !client.is_connected() {
                debug!("Client {} left before pair {} was announced", client.id, pair.id);
                failed = failed.or(Some(client.id));
                continue;
            }

            let msg = ServerMessage::stranger_joined(client.id, pair.id);
            if let Err(e) = client.try_send(msg) {
                warn!(
                    "Error notifying client {} of pair {}: {}",
                    client.id, pair.id, e
                );
                failed = failed.or(Some(client.id));
            }
        }

        match failed {
            Some(client_id) => Err(AppError::DeliveryFailure(client_id)),
            None => {
                debug!("Both clients notified of match in pair {}", pair.id);
                Ok(())
            }
        }
    }

    /// Tell a live client that its stranger left `pair_id`
    ///
    /// Never waits on the client's buffer: if the client is not draining
    /// its channel the notification is dropped with `DeliveryFailure`.
    pub async fn notify_stranger_left(
        &self,
        user_id: ClientId,
        pair_id: PairId,
    ) -> Result<(), AppError> {
        let client = self
            .get_client(user_id)
            .await
            .ok_or(AppError::ClientNotFound(user_id))?;

        client
            .try_send(ServerMessage::stranger_left(user_id, pair_id))
            .map_err(|e| {
                warn!("Dropping strangerLeft for {}: {}", user_id, e);
                AppError::DeliveryFailure(user_id)
            })?;

        debug!("Client {} notified that stranger left", user_id);
        Ok(())
    }

    /// Look up a live client
    pub async fn get_client(&self, user_id: ClientId) -> Option<Arc<Client>> {
        self.clients.read().await.get(&user_id).cloned()
    }

    /// Number of live clients
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Best-effort `strangerLeft` delivery off the caller's path
    fn spawn_stranger_left(&self, user_id: ClientId, pair_id: PairId) {
        let hub = self.clone();
        let permits = self.notify_permits.clone();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = hub.notify_stranger_left(user_id, pair_id).await {
                debug!("Stranger-left notification for {} dropped: {}", user_id, e);
            }
        });
    }
}
