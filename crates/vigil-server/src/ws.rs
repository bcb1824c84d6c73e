//! WebSocket endpoints: one socket per end-user session, a parallel
//! lighter stream for admin dashboards.
//!
//! Each connection gets an outbound mpsc channel drained by a writer
//! task; the [`SessionSink`] the manager holds writes into that
//! channel, so a dead socket surfaces as a send error and the manager
//! tears the session down.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use vigil_core::{format_rfc3339, now_utc};
use vigil_realtime::{ClientMessage, ServerMessage, SessionSink, TransportError};

use crate::state::AppState;

/// Sink writing into the connection's outbound channel.
struct MpscSink {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

#[async_trait]
impl SessionSink for MpscSink {
    async fn send(&self, message: &ServerMessage) -> Result<(), TransportError> {
        self.tx
            .send(message.clone())
            .map_err(|_| TransportError::Closed)
    }
}

/// Spawn the writer task that drains the outbound channel onto the
/// socket.
fn spawn_writer(
    mut socket_tx: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, "unserializable outbound message");
                    continue;
                }
            };
            if socket_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = socket_tx.close().await;
    });
}

pub async fn client_socket(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_client(state, recipient_id, socket))
}

async fn handle_client(state: AppState, recipient_id: String, socket: WebSocket) {
    let (socket_tx, mut socket_rx) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    spawn_writer(socket_tx, rx);

    let session_id = Uuid::new_v4().to_string();
    let recipient = (recipient_id != "anonymous").then_some(recipient_id);
    state
        .manager
        .connect(session_id.clone(), recipient, Arc::new(MpscSink { tx }))
        .await;

    while let Some(frame) = socket_rx.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        match serde_json::from_str::<ClientMessage>(&message) {
            Ok(ClientMessage::Ping) => {
                let pong = ServerMessage::Pong {
                    timestamp: format_rfc3339(now_utc()),
                    stats: None,
                };
                state.manager.send(&session_id, &pong).await;
            }
            Ok(ClientMessage::Subscribe { location, regions }) => {
                if let Some(location) = location {
                    state
                        .manager
                        .subscribe_location(&session_id, location.latitude, location.longitude)
                        .await;
                }
                if !regions.is_empty() {
                    state.manager.subscribe_regions(&session_id, regions);
                }
            }
            Err(err) => {
                debug!(session = %session_id, error = %err, "ignoring unparseable message");
            }
        }
    }

    state.manager.disconnect(&session_id).await;
}

pub async fn admin_socket(
    State(state): State<AppState>,
    Path(admin_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_admin(state, admin_id, socket))
}

async fn handle_admin(state: AppState, admin_id: String, socket: WebSocket) {
    let (socket_tx, mut socket_rx) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    spawn_writer(socket_tx, rx);

    let sink = Arc::new(MpscSink { tx });
    state.manager.connect_admin(admin_id.clone(), sink.clone()).await;

    while let Some(frame) = socket_rx.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        if matches!(
            serde_json::from_str::<ClientMessage>(&message),
            Ok(ClientMessage::Ping)
        ) {
            let pong = ServerMessage::Pong {
                timestamp: format_rfc3339(now_utc()),
                stats: Some(state.manager.stats()),
            };
            if sink.send(&pong).await.is_err() {
                break;
            }
        }
    }

    state.manager.disconnect_admin(&admin_id);
}
