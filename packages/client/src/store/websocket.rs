//! Document store backed by the `yoriai-server` relay.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message, http::StatusCode},
};
use uuid::Uuid;
use yoriai_shared::{
    domain::{ParticipantId, RoomId},
    protocol::{ClientMessage, RejectReason, ServerMessage},
};

use super::{ConnectionState, DocumentStore, MAX_SUBMIT_ATTEMPTS, Snapshot, Updater};
use crate::error::StoreError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
const FIRST_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (1-based): `min(base * 2^(attempt-1), max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

#[derive(Debug)]
enum Reply {
    Accepted(u64),
    Rejected {
        reason: RejectReason,
        message: String,
        current_version: u64,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    snapshot: watch::Sender<Snapshot>,
    connection: watch::Sender<ConnectionState>,
    /// Frames to the server; `None` while offline.
    outgoing: Mutex<Option<mpsc::UnboundedSender<String>>>,
    /// Submissions waiting for `accepted` / `rejected`, by request id.
    pending: Mutex<HashMap<String, oneshot::Sender<Reply>>>,
    /// Set by `close`; the store never comes back online afterwards.
    closed: AtomicBool,
}

impl Shared {
    fn handle_frame(&self, text: &str) {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Ignoring unparsable frame from server: {}", e);
                return;
            }
        };

        match message {
            ServerMessage::Snapshot {
                version, document, ..
            } => {
                // Snapshots can overtake each other around (re)subscription
                let applied = self.snapshot.send_if_modified(|current| {
                    if version > current.version {
                        *current = Snapshot {
                            version,
                            state: document,
                        };
                        true
                    } else {
                        false
                    }
                });
                tracing::debug!("Snapshot version {} (applied: {})", version, applied);
            }
            ServerMessage::Accepted {
                request_id,
                version,
            } => self.resolve(&request_id, Reply::Accepted(version)),
            ServerMessage::Rejected {
                request_id,
                reason,
                message,
                current_version,
            } => self.resolve(
                &request_id,
                Reply::Rejected {
                    reason,
                    message,
                    current_version,
                },
            ),
        }
    }

    fn resolve(&self, request_id: &str, reply: Reply) {
        match lock(&self.pending).remove(request_id) {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => tracing::debug!("Reply for unknown request '{}': {:?}", request_id, reply),
        }
    }

    fn go_online(&self, outgoing: mpsc::UnboundedSender<String>, first: Snapshot) {
        // The server may have restarted with a younger document
        self.snapshot.send_replace(first);
        *lock(&self.outgoing) = Some(outgoing);
        self.connection.send_replace(ConnectionState::Connected);
    }

    /// Drop the outgoing channel and fail every waiting submission.
    fn go_offline(&self, state: ConnectionState) {
        *lock(&self.outgoing) = None;
        // Dropping the senders wakes the submitters with `Disconnected`
        lock(&self.pending).clear();
        self.connection.send_replace(state);
    }

    async fn wait_for_version(&self, version: u64) {
        let mut rx = self.snapshot.subscribe();
        let _ = tokio::time::timeout(SUBMIT_TIMEOUT, rx.wait_for(|s| s.version >= version)).await;
    }
}

/// Document store talking to the relay over one WebSocket.
///
/// While offline `submit` fails with [`StoreError::Disconnected`]; nothing is queued.
pub struct WebSocketDocumentStore {
    shared: Arc<Shared>,
    connection_task: JoinHandle<()>,
}

impl WebSocketDocumentStore {
    /// Connect to `base_url` (e.g. `ws://127.0.0.1:8080/ws`) and wait for the first snapshot.
    pub async fn connect(
        base_url: &str,
        room_id: &RoomId,
        client_id: &ParticipantId,
        policy: ReconnectPolicy,
    ) -> Result<Self, StoreError> {
        let url = format!("{}?room_id={}&client_id={}", base_url, room_id, client_id);
        let (socket, first) = open(&url).await?;
        tracing::info!(
            "Connected to room '{}' at version {} as '{}'",
            room_id,
            first.version,
            client_id
        );

        let (snapshot, _) = watch::channel(Snapshot::default());
        let (connection, _) = watch::channel(ConnectionState::Connected);
        let shared = Arc::new(Shared {
            snapshot,
            connection,
            outgoing: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        shared.go_online(tx, first);

        let connection_task = tokio::spawn(run_connection(shared.clone(), url, policy, socket, rx));

        Ok(Self {
            shared,
            connection_task,
        })
    }

    /// Close the socket and stop reconnecting.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.connection_task.abort();
        self.shared.go_offline(ConnectionState::Disconnected);
    }
}

impl Drop for WebSocketDocumentStore {
    fn drop(&mut self) {
        self.connection_task.abort();
    }
}

#[async_trait]
impl DocumentStore for WebSocketDocumentStore {
    fn read(&self) -> Snapshot {
        self.shared.snapshot.borrow().clone()
    }

    async fn submit(&self, updater: Updater) -> Result<u64, StoreError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        for attempt in 1..=MAX_SUBMIT_ATTEMPTS {
            let base = self.read();
            let document = updater(&base.state);
            if document == base.state {
                return Ok(base.version);
            }

            let request_id = Uuid::new_v4().to_string();
            let frame = ClientMessage::Submit {
                request_id: request_id.clone(),
                base_version: base.version,
                document,
            }
            .to_json()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

            let (tx, rx) = oneshot::channel();
            {
                let outgoing = lock(&self.shared.outgoing);
                let Some(outgoing) = outgoing.as_ref() else {
                    return Err(StoreError::Disconnected);
                };
                lock(&self.shared.pending).insert(request_id.clone(), tx);
                if outgoing.send(frame).is_err() {
                    lock(&self.shared.pending).remove(&request_id);
                    return Err(StoreError::Disconnected);
                }
            }

            let reply = match tokio::time::timeout(SUBMIT_TIMEOUT, rx).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(_)) => return Err(StoreError::Disconnected),
                Err(_) => {
                    lock(&self.shared.pending).remove(&request_id);
                    return Err(StoreError::Transport(format!(
                        "no reply to request '{}'",
                        request_id
                    )));
                }
            };

            match reply {
                Reply::Accepted(version) => return Ok(version),
                Reply::Rejected {
                    reason: RejectReason::Conflict,
                    current_version,
                    ..
                } => {
                    tracing::debug!(
                        "Submission on version {} conflicted (attempt {}/{}), room is at {}",
                        base.version,
                        attempt,
                        MAX_SUBMIT_ATTEMPTS,
                        current_version
                    );
                    self.shared.wait_for_version(current_version).await;
                }
                Reply::Rejected { message, .. } => {
                    tracing::warn!("Submission rejected: {}", message);
                    return Err(StoreError::Rejected(message));
                }
            }
        }

        Err(StoreError::Conflict {
            attempts: MAX_SUBMIT_ATTEMPTS,
        })
    }

    fn connection(&self) -> ConnectionState {
        *self.shared.connection.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }
}

/// Open the socket and read the first snapshot.
async fn open(url: &str) -> Result<(Socket, Snapshot), StoreError> {
    let mut socket = match connect_async(url).await {
        Ok((socket, _response)) => socket,
        Err(WsError::Http(response)) if response.status() == StatusCode::CONFLICT => {
            return Err(StoreError::AlreadyConnected);
        }
        Err(e) => return Err(StoreError::Transport(e.to_string())),
    };

    let first = tokio::time::timeout(FIRST_SNAPSHOT_TIMEOUT, async {
        while let Some(message) = socket.next().await {
            let message = message.map_err(|e| StoreError::Transport(e.to_string()))?;
            if let Message::Text(text) = message
                && let Ok(ServerMessage::Snapshot {
                    version, document, ..
                }) = serde_json::from_str::<ServerMessage>(&text)
            {
                return Ok(Snapshot {
                    version,
                    state: document,
                });
            }
        }
        Err(StoreError::Transport(
            "connection closed before the first snapshot".to_string(),
        ))
    })
    .await
    .map_err(|_| StoreError::Transport("timed out waiting for the first snapshot".to_string()))??;

    Ok((socket, first))
}

/// Pump one socket until it breaks, then reconnect with backoff.
async fn run_connection(
    shared: Arc<Shared>,
    url: String,
    policy: ReconnectPolicy,
    socket: Socket,
    outgoing: mpsc::UnboundedReceiver<String>,
) {
    let mut current = Some((socket, outgoing));

    while let Some((socket, outgoing)) = current.take() {
        drive(&shared, socket, outgoing).await;
        tracing::warn!("Connection to the room was lost");

        for attempt in 1..=policy.max_attempts {
            shared.go_offline(ConnectionState::Reconnecting { attempt });
            let delay = policy.delay(attempt);
            tracing::info!(
                "Reconnecting in {:?}... (attempt {}/{})",
                delay,
                attempt,
                policy.max_attempts
            );
            tokio::time::sleep(delay).await;

            match open(&url).await {
                Ok((socket, first)) => {
                    tracing::info!("Reconnected at version {}", first.version);
                    let (tx, rx) = mpsc::unbounded_channel();
                    shared.go_online(tx, first);
                    current = Some((socket, rx));
                    break;
                }
                Err(e) => tracing::warn!("Reconnection attempt {} failed: {}", attempt, e),
            }
        }
    }

    tracing::error!(
        "Failed to reconnect after {} attempts. Giving up.",
        policy.max_attempts
    );
    shared.go_offline(ConnectionState::Disconnected);
}

/// Runs until either direction of the socket fails.
///
/// Both halves are owned by this future, so aborting the connection task
/// closes the socket.
async fn drive(
    shared: &Arc<Shared>,
    socket: Socket,
    mut outgoing: mpsc::UnboundedReceiver<String>,
) {
    let (mut write, mut read) = socket.split();

    let send = async {
        while let Some(frame) = outgoing.recv().await {
            if let Err(e) = write.send(Message::Text(frame.into())).await {
                tracing::warn!("Failed to send frame: {}", e);
                break;
            }
        }
    };

    let recv = async {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => shared.handle_frame(&text),
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = send => {}
        _ = recv => {}
    }
}
