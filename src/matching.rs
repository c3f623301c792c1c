//! Matching engine
//!
//! Owns the FIFO waiting queue and the directory of active pairs.
//! Every mutation happens under one exclusive lock held for the whole
//! sequence, so a waiting client can never be paired twice and a pair is
//! never observable half-created or half-ended.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::AppError;
use crate::pair::ChatPair;
use crate::types::{ClientId, PairId};

/// State guarded by the engine lock
#[derive(Default)]
struct MatchState {
    /// Clients awaiting a match, in arrival order
    waiting: VecDeque<Arc<Client>>,
    /// Ids currently in `waiting`
    queued: HashSet<ClientId>,
    /// All active pairs: PairId -> ChatPair
    active_pairs: HashMap<PairId, Arc<ChatPair>>,
    /// Participant to pair mapping for fast lookup
    user_pairs: HashMap<ClientId, PairId>,
}

impl MatchState {
    fn enqueue(&mut self, client: Arc<Client>) {
        self.queued.insert(client.id);
        self.waiting.push_back(client);
    }

    fn pop_waiting(&mut self) -> Option<Arc<Client>> {
        let client = self.waiting.pop_front()?;
        self.queued.remove(&client.id);
        Some(client)
    }

    /// Remove the pair and both participants' entries in one step
    fn remove_pair(&mut self, pair_id: PairId) -> Option<Arc<ChatPair>> {
        let pair = self.active_pairs.remove(&pair_id)?;
        pair.close();
        for user_id in pair.participants() {
            self.user_pairs.remove(&user_id);
        }
        Some(pair)
    }
}

/// Pairs waiting clients and tracks active pairs
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone, Default)]
pub struct MatchingEngine {
    state: Arc<RwLock<MatchState>>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to find a partner for the given client
    ///
    /// Returns the new pair if one was formed, or None if the client is
    /// now waiting in the queue. The caller is responsible for telling the
    /// client which one happened.
    pub async fn find_match(&self, client: Arc<Client>) -> Result<Option<Arc<ChatPair>>, AppError> {
        let mut state = self.state.write().await;

        if state.user_pairs.contains_key(&client.id) {
            return Err(AppError::AlreadyInChat);
        }

        // Re-entry keeps the original queue position
        if state.queued.contains(&client.id) {
            debug!("Client {} is already waiting", client.id);
            return Ok(None);
        }

        let Some(stranger) = state.pop_waiting() else {
            info!("Client {} added to waiting queue", client.id);
            state.enqueue(client);
            return Ok(None);
        };

        if stranger.id == client.id {
            state.enqueue(stranger);
            return Ok(None);
        }

        let pair = Arc::new(ChatPair::new(client, stranger));
        state.active_pairs.insert(pair.id, pair.clone());
        for user_id in pair.participants() {
            state.user_pairs.insert(user_id, pair.id);
        }

        info!(
            "Matched clients {} and {} in pair {}",
            pair.first.id, pair.second.id, pair.id
        );
        debug!(
            "Waiting: {}, Active pairs: {}",
            state.waiting.len(),
            state.active_pairs.len()
        );

        Ok(Some(pair))
    }

    /// Remove a client from the waiting queue
    ///
    /// Idempotent. Returns true if the client was waiting.
    pub async fn remove_from_queue(&self, user_id: ClientId) -> bool {
        let mut state = self.state.write().await;

        if !state.queued.remove(&user_id) {
            return false;
        }
        state.waiting.retain(|c| c.id != user_id);

        info!("Client {} removed from waiting queue", user_id);
        true
    }

    /// Get the active pair of a client
    pub async fn get_pair(&self, user_id: ClientId) -> Result<Arc<ChatPair>, AppError> {
        let state = self.state.read().await;

        state
            .user_pairs
            .get(&user_id)
            .and_then(|pair_id| state.active_pairs.get(pair_id))
            .cloned()
            .ok_or(AppError::NotInChat)
    }

    /// Get an active pair by its id
    pub async fn get_pair_by_id(&self, pair_id: PairId) -> Result<Arc<ChatPair>, AppError> {
        let state = self.state.read().await;

        state
            .active_pairs
            .get(&pair_id)
            .cloned()
            .ok_or(AppError::PairNotFound(pair_id))
    }

    /// End a pair and release both participants
    pub async fn end_pair(&self, pair_id: PairId) -> Result<(), AppError> {
        let mut state = self.state.write().await;

        state
            .remove_pair(pair_id)
            .ok_or(AppError::PairNotFound(pair_id))?;

        info!("Pair {} ended", pair_id);
        Ok(())
    }

    /// End whatever pair the client is in and return it
    ///
    /// Only one of several concurrent callers for the same pair gets it
    /// back; the rest see NotInChat.
    pub async fn end_user_pair(&self, user_id: ClientId) -> Result<Arc<ChatPair>, AppError> {
        let mut state = self.state.write().await;

        let pair_id = *state.user_pairs.get(&user_id).ok_or(AppError::NotInChat)?;
        let pair = state.remove_pair(pair_id).ok_or(AppError::NotInChat)?;

        info!("Pair {} ended by client {}", pair_id, user_id);
        Ok(pair)
    }

    /// Check whether a client is in the waiting queue
    pub async fn is_waiting(&self, user_id: ClientId) -> bool {
        self.state.read().await.queued.contains(&user_id)
    }

    /// Number of clients waiting for a match
    pub async fn queue_size(&self) -> usize {
        self.state.read().await.waiting.len()
    }

    /// Number of active pairs
    pub async fn active_pairs_count(&self) -> usize {
        self.state.read().await.active_pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_client() -> Arc<Client> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(Client::new(ClientId::new(), tx))
    }

    #[tokio::test]
    async fn test_first_client_waits_second_matches() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();

        assert!(engine.find_match(a.clone()).await.unwrap().is_none());
        assert_eq!(engine.queue_size().await, 1);

        let pair = engine.find_match(b.clone()).await.unwrap().unwrap();
        assert!(pair.contains(a.id));
        assert!(pair.contains(b.id));
        assert_eq!(engine.queue_size().await, 0);
        assert_eq!(engine.active_pairs_count().await, 1);

        assert_eq!(engine.get_pair(a.id).await.unwrap().id, pair.id);
        assert_eq!(engine.get_pair(b.id).await.unwrap().id, pair.id);
    }

    #[tokio::test]
    async fn test_already_in_chat() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();
        engine.find_match(a.clone()).await.unwrap();
        engine.find_match(b.clone()).await.unwrap();

        let result = engine.find_match(a.clone()).await;
        assert!(matches!(result, Err(AppError::AlreadyInChat)));
        assert_eq!(engine.queue_size().await, 0);
        assert_eq!(engine.active_pairs_count().await, 1);
    }

    #[tokio::test]
    async fn test_oldest_waiter_is_matched_first() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();

        // Put A and B in the queue directly: both are waiting, A first
        {
            let mut state = engine.state.write().await;
            state.enqueue(a.clone());
            state.enqueue(b.clone());
        }

        let c = test_client();
        let pair = engine.find_match(c.clone()).await.unwrap().unwrap();
        assert!(pair.contains(a.id));
        assert!(!pair.contains(b.id));
        assert!(engine.is_waiting(b.id).await);
    }

    #[tokio::test]
    async fn test_no_self_match() {
        let engine = MatchingEngine::new();
        let a = test_client();

        for _ in 0..5 {
            assert!(engine.find_match(a.clone()).await.unwrap().is_none());
        }

        assert_eq!(engine.queue_size().await, 1);
        assert_eq!(engine.active_pairs_count().await, 0);
        assert!(matches!(engine.get_pair(a.id).await, Err(AppError::NotInChat)));
    }

    #[tokio::test]
    async fn test_reentry_keeps_queue_position() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();
        {
            let mut state = engine.state.write().await;
            state.enqueue(a.clone());
            state.enqueue(b.clone());
        }

        // B asks again while A is at the head: B must not be paired while
        // still sitting in the queue
        assert!(engine.find_match(b.clone()).await.unwrap().is_none());
        assert_eq!(engine.queue_size().await, 2);
        assert_eq!(engine.active_pairs_count().await, 0);
    }

    #[tokio::test]
    async fn test_end_pair_releases_both() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();
        engine.find_match(a.clone()).await.unwrap();
        let pair = engine.find_match(b.clone()).await.unwrap().unwrap();

        engine.end_pair(pair.id).await.unwrap();

        assert!(!pair.is_active());
        assert!(matches!(engine.get_pair(a.id).await, Err(AppError::NotInChat)));
        assert!(matches!(engine.get_pair(b.id).await, Err(AppError::NotInChat)));
        assert!(matches!(
            engine.get_pair_by_id(pair.id).await,
            Err(AppError::PairNotFound(id)) if id == pair.id
        ));
        assert_eq!(engine.active_pairs_count().await, 0);
    }

    #[tokio::test]
    async fn test_end_unknown_pair() {
        let engine = MatchingEngine::new();
        let result = engine.end_pair(PairId::new()).await;
        assert!(matches!(result, Err(AppError::PairNotFound(_))));
    }

    #[tokio::test]
    async fn test_end_user_pair_only_once() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();
        engine.find_match(a.clone()).await.unwrap();
        let pair = engine.find_match(b.clone()).await.unwrap().unwrap();

        let ended = engine.end_user_pair(a.id).await.unwrap();
        assert_eq!(ended.id, pair.id);

        assert!(matches!(engine.end_user_pair(b.id).await, Err(AppError::NotInChat)));
        assert!(matches!(engine.end_user_pair(a.id).await, Err(AppError::NotInChat)));
    }

    #[tokio::test]
    async fn test_ended_participants_can_search_again() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();
        engine.find_match(a.clone()).await.unwrap();
        let first = engine.find_match(b.clone()).await.unwrap().unwrap();
        engine.end_pair(first.id).await.unwrap();

        assert!(engine.find_match(a.clone()).await.unwrap().is_none());
        let second = engine.find_match(b.clone()).await.unwrap().unwrap();
        assert_ne!(first.id, second.id);
        assert!(!first.is_active());
        assert!(second.is_active());
    }

    #[tokio::test]
    async fn test_remove_from_queue_idempotent() {
        let engine = MatchingEngine::new();
        let a = test_client();
        let b = test_client();
        engine.find_match(a.clone()).await.unwrap();

        assert!(engine.remove_from_queue(a.id).await);
        assert!(!engine.remove_from_queue(a.id).await);
        assert!(!engine.remove_from_queue(b.id).await);
        assert_eq!(engine.queue_size().await, 0);

        // Nobody left to pair against
        assert!(engine.find_match(b.clone()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_odd_number_leaves_one_waiting() {
        let engine = MatchingEngine::new();
        let clients: Vec<_> = (0..7).map(|_| test_client()).collect();

        let mut pairs = Vec::new();
        for client in &clients {
            if let Some(pair) = engine.find_match(client.clone()).await.unwrap() {
                pairs.push(pair);
            }
        }

        assert_eq!(pairs.len(), 3);
        assert_eq!(engine.queue_size().await, 1);

        let mut seen = HashSet::new();
        for pair in &pairs {
            for id in pair.participants() {
                assert!(seen.insert(id), "client {} in two pairs", id);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_find_match_perfect_matching() {
        const N: usize = 50;
        let engine = MatchingEngine::new();
        let clients: Vec<_> = (0..2 * N).map(|_| test_client()).collect();

        let handles: Vec<_> = clients
            .iter()
            .cloned()
            .map(|client| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.find_match(client).await })
            })
            .collect();

        let mut pair_ids = HashSet::new();
        for handle in handles {
            if let Some(pair) = handle.await.unwrap().unwrap() {
                assert!(pair_ids.insert(pair.id), "duplicate pair id");
            }
        }

        assert_eq!(pair_ids.len(), N);
        assert_eq!(engine.queue_size().await, 0);
        assert_eq!(engine.active_pairs_count().await, N);

        let mut seen = HashSet::new();
        for client in &clients {
            let pair = engine.get_pair(client.id).await.unwrap();
            assert!(pair_ids.contains(&pair.id));
            let partner = pair.get_partner(client.id).unwrap();
            assert_ne!(partner.id, client.id);
            seen.insert(client.id);
        }
        assert_eq!(seen.len(), 2 * N);
    }
}
