//! ChatPair struct definition
//!
//! Represents two strangers matched for a 1:1 chat.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::client::Client;
use crate::types::{ClientId, PairId};

/// Matched pair of strangers
///
/// Created active by the matching engine and deactivated exactly once
/// when it ends. An ended pair is discarded, never reactivated.
#[derive(Debug)]
pub struct ChatPair {
    /// Pair identifier
    pub id: PairId,
    /// Client that was matched by the incoming request
    pub first: Arc<Client>,
    /// Client that was waiting in the queue
    pub second: Arc<Client>,
    /// Pair creation time
    pub created_at: DateTime<Utc>,
    active: AtomicBool,
}

impl ChatPair {
    /// Create a new active pair
    pub fn new(first: Arc<Client>, second: Arc<Client>) -> Self {
        debug_assert_ne!(first.id, second.id, "a client cannot be paired with itself");
        Self {
            id: PairId::new(),
            first,
            second,
            created_at: Utc::now(),
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the pair as ended
    pub(crate) fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Get the partner of a given client
    ///
    /// Returns None if the client is not in the pair.
    pub fn get_partner(&self, client_id: ClientId) -> Option<&Arc<Client>> {
        if self.first.id == client_id {
            Some(&self.second)
        } else if self.second.id == client_id {
            Some(&self.first)
        } else {
            None
        }
    }

    /// Check if a client is in this pair
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.first.id == client_id || self.second.id == client_id
    }

    /// Both participant ids
    pub fn participants(&self) -> [ClientId; 2] {
        [self.first.id, self.second.id]
    }
}
