//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based anonymous user identifier
//! - `PairId`: UUID-based identifier of a matched chat pair

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID for type-safe client identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat pair identifier
///
/// Generated once when two clients are matched and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(pub Uuid);

impl PairId {
    /// Create a new random pair ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Used by `searching`, which is not tied to any pair yet
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for PairId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
