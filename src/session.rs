//! Anonymous session identity
//!
//! A reconnecting browser may present its previous id in the
//! `X-Session-ID` header; anything else gets a fresh id.

use tokio_tungstenite::tungstenite::http::HeaderMap;
use uuid::Uuid;

use crate::types::ClientId;

/// Upgrade request header carrying a previous session id
pub const SESSION_HEADER: &str = "x-session-id";

/// Pick the client id for a connection from its upgrade headers
pub fn resolve_client_id(headers: &HeaderMap) -> ClientId {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .filter(|id| !id.is_nil())
        .map(ClientId)
        .unwrap_or_default()
}
