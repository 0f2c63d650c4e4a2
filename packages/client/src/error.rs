//! Error types of the client core.

use thiserror::Error;
use yoriai_shared::domain::{TaskError, ValidationError};

/// Failures of the shared document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not connected to the room")]
    Disconnected,

    #[error("Gave up after {attempts} conflicting submissions")]
    Conflict { attempts: u32 },

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("This participant is already connected to the room")]
    AlreadyConnected,

    #[error("Store is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("This room is full ({capacity} participants)")]
    RoomFull { capacity: usize },

    #[error("Already joined")]
    AlreadyJoined,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of task list mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveEditError {
    #[error("No task is being edited")]
    NotEditing,

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Join the room first")]
    NotJoined,

    #[error("No task is being edited")]
    NotEditing,

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    LiveEdit(#[from] LiveEditError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors of the terminal client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Participant id is already connected to this room
    #[error("Participant '{0}' is already connected to this room")]
    DuplicateClientId(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
