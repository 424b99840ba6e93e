use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

pub mod connection;

use connection::ConnectionId;
pub use connection::ConnectionManager;

/// Pumps one room's events to a client until either side closes.
///
/// The socket is push-only; anything the client sends only counts as
/// activity.
pub async fn handle_connection(
    websocket: WebSocket,
    room_id: String,
    connection_manager: Arc<ConnectionManager>,
) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection {} for room {}", connection_id, room_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let message_receiver = connection_manager.create_connection(connection_id, &room_id);

    // Handle incoming messages
    let incoming_handler = {
        let connection_manager = connection_manager.clone();
        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) if msg.is_close() => break,
                    Ok(_) => connection_manager.update_activity(connection_id),
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    // Handle outgoing messages
    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(event) = receiver.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send event to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    connection_manager.remove_connection(connection_id);
}
