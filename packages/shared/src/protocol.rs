//! WebSocket messages between the relay server and clients.
//!
//! Every frame is a JSON text frame tagged by `"type"`.

use serde::{Deserialize, Serialize};

use crate::domain::{RoomId, SharedState};

/// Client → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Propose `document` as the successor of version `base_version`.
    #[serde(rename_all = "camelCase")]
    Submit {
        request_id: String,
        base_version: u64,
        document: SharedState,
    },
}

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Current document; sent on connect and after every accepted change.
    #[serde(rename_all = "camelCase")]
    Snapshot {
        room_id: RoomId,
        version: u64,
        document: SharedState,
    },

    #[serde(rename_all = "camelCase")]
    Accepted { request_id: String, version: u64 },

    #[serde(rename_all = "camelCase")]
    Rejected {
        request_id: String,
        reason: RejectReason,
        message: String,
        current_version: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// `base_version` is not the current version.
    Conflict,
    /// The transition broke the authorization policy.
    Policy,
    /// The frame could not be parsed.
    Malformed,
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
