//! The `/hubs/calls` event channel.
//!
//! Each accepted socket becomes one broadcaster subscriber. A dedicated
//! forward task drains the subscriber's queue into `incomingCall` frames, so
//! delivery to this client can never stall another one; the read side only
//! has to understand `joinGroup` requests and the close handshake.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use callpop_call_events::{ClientMessage, ServerMessage};

use super::AppState;

/// WebSocket upgrade handler for `/hubs/calls`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let mut events = state.broadcaster.join(connection_id);
    info!(%connection_id, "Hub connection established");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let forward = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = ServerMessage::IncomingCall(event);
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize incomingCall frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                debug!("Hub send failed, client disconnected");
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::JoinGroup { group }) => {
                    state.broadcaster.join_group(connection_id, group);
                }
                Err(e) => {
                    warn!(%connection_id, error = %e, "Unparseable hub message");
                }
            },
            Ok(Message::Close(_)) => {
                debug!(%connection_id, "Client sent close frame");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%connection_id, error = %e, "Hub socket error");
                break;
            }
        }
    }

    // Safe even if the forward task already pruned this subscriber.
    state.broadcaster.leave(connection_id);
    forward.abort();
    info!(%connection_id, "Hub connection closed");
}
