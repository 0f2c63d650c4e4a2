//! UseCase 層のエラー型

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Client '{0}' is already subscribed to this room")]
    DuplicateClientId(String),

    #[error("Failed to send the initial snapshot: {0}")]
    SnapshotFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("stale base version {base}, room is at {current}")]
    Conflict { base: u64, current: u64 },

    #[error("{message}")]
    Policy { message: String, current: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Invalid room id")]
    InvalidRoomId,
}
