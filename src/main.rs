//! Stranger chat server - Entry Point
//!
//! Loads configuration, wires the matching engine, hub and router
//! together, and runs the accept loop.

use std::env;

use tracing::info;
use tracing_subscriber::EnvFilter;

use stranger_chat::{ChatServer, Config, Hub, MatchingEngine, Router};

/// Config file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=stranger_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stranger_chat=info")),
        )
        .init();

    // Get config path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let matching = MatchingEngine::new();
    let hub = Hub::with_notify_workers(matching, config.notify_workers);
    let router = Router::new(hub);

    let server = ChatServer::bind(&config, router).await?;
    info!("Stranger chat server listening on {}", server.local_addr()?);

    server.run().await;

    Ok(())
}
