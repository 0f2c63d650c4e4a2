//! HTTP API の DTO

use serde::{Deserialize, Serialize};
use yoriai_shared::{
    domain::Task,
    time::timestamp_to_rfc3339,
};

use crate::domain::RoomDocument;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub version: u64,
    /// 文書に記録されている参加者の表示名
    pub participants: Vec<String>,
    pub task_count: usize,
    /// WebSocket で接続中の参加者 ID
    pub subscribers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetailDto {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub version: u64,
    pub created_at: String,
    pub participants: Vec<ParticipantDetailDto>,
    pub tasks: Vec<Task>,
}

impl From<&RoomDocument> for RoomSummaryDto {
    fn from(room: &RoomDocument) -> Self {
        Self {
            id: room.id.to_string(),
            version: room.version,
            participants: room.state.users.values().map(|p| p.name.clone()).collect(),
            task_count: room.state.tasks.len(),
            subscribers: room.subscribers.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl From<&RoomDocument> for RoomDetailDto {
    fn from(room: &RoomDocument) -> Self {
        Self {
            id: room.id.to_string(),
            version: room.version,
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            participants: room
                .state
                .users
                .values()
                .map(|p| ParticipantDetailDto {
                    id: p.id.to_string(),
                    name: p.name.clone(),
                    is_active: p.is_active,
                    last_seen: p.last_seen.map(|t| timestamp_to_rfc3339(t.value())),
                })
                .collect(),
            tasks: room.state.tasks.clone(),
        }
    }
}
