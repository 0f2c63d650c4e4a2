//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use yoriai_shared::{
    domain::{ParticipantId, RoomId},
    protocol::ClientMessage,
};

use crate::{
    domain::SubscriberKey,
    ui::state::AppState,
    usecase::ConnectError,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub room_id: String,
    pub client_id: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let (room_id, client_id) = match (
        RoomId::new(query.room_id.clone()),
        ParticipantId::new(query.client_id.clone()),
    ) {
        (Ok(room_id), Ok(client_id)) => (room_id, client_id),
        _ => {
            tracing::warn!(
                "Invalid room_id '{}' or client_id '{}'",
                query.room_id,
                query.client_id
            );
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    // Create a channel for this subscriber to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    // The initial snapshot is queued on `tx` inside the use case
    match state
        .connect_subscriber_usecase
        .execute(room_id.clone(), client_id.clone(), tx)
        .await
    {
        Ok(room) => {
            tracing::info!(
                "Client '{}' subscribed to room '{}' at version {}",
                client_id,
                room_id,
                room.version
            );
            let key = SubscriberKey::new(room_id, client_id);
            let failed_state = state.clone();
            let failed_key = key.clone();
            Ok(ws
                .on_failed_upgrade(move |e| {
                    tracing::warn!("WebSocket upgrade for '{}' failed: {}", failed_key, e);
                    tokio::spawn(async move {
                        let _ = failed_state
                            .disconnect_subscriber_usecase
                            .execute(failed_key.room_id, failed_key.client_id)
                            .await;
                    });
                })
                .on_upgrade(move |socket| handle_socket(socket, state, key, rx)))
        }
        Err(ConnectError::DuplicateClientId(id)) => {
            tracing::warn!(
                "Client with ID '{}' is already subscribed to room '{}'. Rejecting connection.",
                id,
                room_id
            );
            Err(StatusCode::CONFLICT)
        }
        Err(e @ ConnectError::SnapshotFailed(_)) => {
            tracing::error!("Failed to connect '{}': {}", client_id, e);
            // Undo the registration done before the failure
            if let Err(e) = state
                .disconnect_subscriber_usecase
                .execute(room_id, client_id)
                .await
            {
                tracing::warn!("Failed to roll back subscription: {}", e);
            }
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Spawns a task that forwards queued messages to the WebSocket sender.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    key: SubscriberKey,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let state_clone = state.clone();
    let key_clone = key.clone();

    // Spawn a task to receive submissions from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Submit {
                        request_id,
                        base_version,
                        document,
                    }) => {
                        tracing::debug!(
                            "Submission '{}' from '{}' on version {}",
                            request_id,
                            key_clone,
                            base_version
                        );
                        // Replies are pushed by the use case
                        let _ = state_clone
                            .submit_document_usecase
                            .execute(
                                key_clone.room_id.clone(),
                                key_clone.client_id.clone(),
                                request_id,
                                base_version,
                                document,
                            )
                            .await;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse message from '{}': {}", key_clone, e);
                        state_clone
                            .submit_document_usecase
                            .reject_malformed(&key_clone, e.to_string())
                            .await;
                    }
                },
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", key_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push snapshots and replies to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    match state
        .disconnect_subscriber_usecase
        .execute(key.room_id.clone(), key.client_id.clone())
        .await
    {
        Ok(remaining) => {
            tracing::info!(
                "Client '{}' disconnected, {} subscriber(s) left",
                key,
                remaining.len()
            );
        }
        Err(e) => {
            tracing::warn!("Failed to disconnect '{}': {}", key, e);
        }
    }
}
