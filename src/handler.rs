//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! session identity, message dispatch, and cleanup on disconnect.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::router::Router;
use crate::session::resolve_client_id;
use crate::types::ClientId;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers the client with the hub,
/// and runs until either side closes. The hub cleanup always runs once
/// the client is registered.
pub async fn handle_connection(
    stream: TcpStream,
    router: Router,
    client_buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake, capturing the session header
    let mut requested_id = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        requested_id = Some(resolve_client_id(req.headers()));
        Ok::<Response, ErrorResponse>(resp)
    })
    .await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let hub = router.hub().clone();

    // Channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(client_buffer);

    // A still-live id cannot be taken over by a second connection
    let mut client = Arc::new(Client::new(requested_id.unwrap_or_default(), msg_tx));
    if !hub.try_add_client(client.clone()).await {
        warn!("Session {} already connected, issuing a new id", client.id);
        client = Arc::new(Client::new(ClientId::new(), client.sender.clone()));
        hub.add_client(client.clone()).await;
    }
    let client_id = client.id;
    info!("Client {} connected from {}", client_id, peer_addr);

    // Read task (WebSocket -> Router)
    let read_router = router.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    read_router.dispatch(&client, &text).await;
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client.id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", client.id);
                }
                Ok(_) => {
                    // Binary, pong and raw frames are ignored
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client.id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client.id);
    });

    // Write task (ServerMessage -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for {}", client_id);

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete, then stop the other. Cleanup must
    // not start until no dispatch for this client can still be running.
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            write_task.abort();
            let _ = write_task.await;
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            read_task.abort();
            let _ = read_task.await;
        }
    }

    hub.remove_client(client_id).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}
