//! `WebSocket` handler for real-time state streaming.
//!
//! Clients connect to `GET /ws/state` and receive a JSON-encoded
//! message `{"type": "state", "joints": {...}}` on every broadcast
//! tick. The first client to connect starts the broadcast loop.
//!
//! Disconnection is detected on the next failed delivery: either the
//! hub drops the closed channel, or the socket send fails here and the
//! handler unsubscribes explicitly.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming state snapshots.
///
/// # Route
///
/// `GET /ws/state`
pub async fn ws_state(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe to the broadcast hub
/// and forward each snapshot as a text frame.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut subscription = state.coordinator.subscribe().await;
    let id = subscription.id();

    loop {
        tokio::select! {
            // Receive a snapshot from the broadcast hub.
            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    // The hub dropped this subscriber (failed delivery
                    // or shutdown); nothing left to forward.
                    debug!("subscription closed by hub");
                    break;
                };
                let payload = serde_json::json!({
                    "type": "state",
                    "joints": snapshot,
                });
                let json = match serde_json::to_string(&payload) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("Failed to serialize state snapshot: {e}");
                        continue;
                    }
                };
                let msg: Message = Message::Text(json.into());
                if socket.send(msg).await.is_err() {
                    debug!("WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let pong = Message::Pong(data);
                        if socket.send(pong).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore other message types from the client.
                    }
                }
            }
        }
    }

    state.coordinator.unsubscribe(id).await;
}
