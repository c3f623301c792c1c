//! Anonymous 1:1 WebSocket Stranger Chat Library
//!
//! Randomly pairs anonymous users for one-on-one text chat, relays their
//! messages, and handles skipping and disconnects.
//!
//! # Features
//! - WebSocket connection handling with anonymous session ids
//! - FIFO matchmaking (`findMatch`)
//! - Real-time chat messaging between paired strangers
//! - Skipping to the next stranger and stopping the chat
//! - Typing indicators
//! - Disconnection handling with partner notification
//!
//! # Architecture
//! - `MatchingEngine` owns the waiting queue and the active pairs
//! - `Hub` owns the live connections and delivers messages
//! - `Router` turns decoded client requests into calls on both
//! - Each connection has a read task and a write task
//!
//! Each component has its own lock, and neither is held while calling the
//! other or while writing to a connection.
//!
//! # Example
//! ```ignore
//! use stranger_chat::{ChatServer, Config, Hub, MatchingEngine, Router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let router = Router::new(Hub::new(MatchingEngine::new()));
//!     let server = ChatServer::bind(&config, router).await.unwrap();
//!     server.run().await;
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod matching;
pub mod message;
pub mod pair;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use hub::Hub;
pub use matching::MatchingEngine;
pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use pair::ChatPair;
pub use router::Router;
pub use server::ChatServer;
pub use types::{ClientId, PairId};
