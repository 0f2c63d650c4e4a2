//! Shared document store contract.
//!
//! Mutations are whole-document: the caller hands over a pure updater from the
//! current snapshot to the next one, and the store proposes the result against
//! the version it was computed from. When the store has moved on in the
//! meantime, the updater is re-applied to the newer snapshot.

mod memory;
mod websocket;

use async_trait::async_trait;
use tokio::sync::watch;
use yoriai_shared::domain::SharedState;

use crate::error::StoreError;

pub use memory::InMemoryDocumentStore;
pub use websocket::{ReconnectPolicy, WebSocketDocumentStore};

/// Number of times an updater is applied before `submit` gives up on conflicts.
pub const MAX_SUBMIT_ATTEMPTS: u32 = 5;

/// Pure transformation from one document to its successor.
pub type Updater = Box<dyn Fn(&SharedState) -> SharedState + Send + Sync>;

/// A document together with the version it was stored as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub state: SharedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting { attempt: u32 },
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Latest known snapshot.
    fn read(&self) -> Snapshot;

    /// Apply `updater` to the latest snapshot and store the result.
    ///
    /// Returns the version the document is at afterwards. An updater that
    /// returns its input unchanged stores nothing.
    async fn submit(&self, updater: Updater) -> Result<u64, StoreError>;

    fn connection(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.connection().is_connected()
    }

    /// Receiver notified with every new snapshot.
    fn subscribe(&self) -> watch::Receiver<Snapshot>;

    /// Receiver notified on every connectivity change.
    fn watch_connection(&self) -> watch::Receiver<ConnectionState>;
}
