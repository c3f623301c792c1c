//! ChatServer implementation
//!
//! Owns the TCP listener and spawns one connection handler per accepted
//! stream. All handlers share the router injected at construction.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::router::Router;

/// Accept loop for the chat server
pub struct ChatServer {
    listener: TcpListener,
    router: Router,
    client_buffer: usize,
}

impl ChatServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &Config, router: Router) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self {
            listener,
            router,
            client_buffer: config.client_buffer,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop
    ///
    /// Accept errors are logged and the loop keeps going.
    pub async fn run(self) {
        info!("ChatServer started");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let router = self.router.clone();
                    let client_buffer = self.client_buffer;

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, router, client_buffer).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
