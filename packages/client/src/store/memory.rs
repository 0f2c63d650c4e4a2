//! Process-local document store.

use async_trait::async_trait;
use tokio::sync::watch;
use yoriai_shared::domain::SharedState;

use super::{ConnectionState, DocumentStore, Snapshot, Updater};
use crate::error::StoreError;

/// Document store living in this process.
///
/// Submissions are serialised by the watch channel's lock, so an updater
/// always sees the latest document and never conflicts.
pub struct InMemoryDocumentStore {
    snapshot: watch::Sender<Snapshot>,
    connection: watch::Sender<ConnectionState>,
}

impl InMemoryDocumentStore {
    pub fn new(state: SharedState) -> Self {
        let (snapshot, _) = watch::channel(Snapshot { version: 0, state });
        let (connection, _) = watch::channel(ConnectionState::Connected);
        Self {
            snapshot,
            connection,
        }
    }

    /// Simulate a connectivity change.
    pub fn set_connected(&self, connected: bool) {
        let state = if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.connection.send_replace(state);
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new(SharedState::default())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn read(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    async fn submit(&self, updater: Updater) -> Result<u64, StoreError> {
        if !self.connection.borrow().is_connected() {
            return Err(StoreError::Disconnected);
        }

        let mut version = 0;
        self.snapshot.send_if_modified(|current| {
            let next = updater(&current.state);
            if next != current.state {
                current.state = next;
                current.version += 1;
                version = current.version;
                true
            } else {
                version = current.version;
                false
            }
        });
        Ok(version)
    }

    fn connection(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }
}
