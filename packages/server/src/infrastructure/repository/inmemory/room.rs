//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! ルーム ID をキーにした HashMap をインメモリ DB として使用します。
//! プロセスが終了すると全ルームの文書は失われます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use yoriai_shared::domain::{ParticipantId, RoomId, SharedState, Timestamp};

use crate::domain::{RepositoryError, RoomDocument, RoomRepository};

/// インメモリ Room Repository 実装
///
/// 1 つの Mutex で全ルームを保護するため、各操作はルーム単位で原子的です。
pub struct InMemoryRoomRepository {
    rooms: Arc<Mutex<HashMap<RoomId, RoomDocument>>>,
    /// 新規ルームにオンボーディングタスクを入れるか
    seed_new_rooms: bool,
}

impl InMemoryRoomRepository {
    pub fn new(seed_new_rooms: bool) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            seed_new_rooms,
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn get_or_create_room(&self, room_id: &RoomId, now: Timestamp) -> RoomDocument {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::info!("Room '{}' created", room_id);
                RoomDocument::new(room_id.clone(), now, self.seed_new_rooms)
            })
            .clone()
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<RoomDocument, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))
    }

    async fn list_rooms(&self) -> Vec<RoomDocument> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<RoomDocument> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    async fn add_subscriber(
        &self,
        room_id: &RoomId,
        client_id: ParticipantId,
        now: Timestamp,
    ) -> Result<RoomDocument, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created", room_id);
            RoomDocument::new(room_id.clone(), now, self.seed_new_rooms)
        });
        room.add_subscriber(client_id)?;
        Ok(room.clone())
    }

    async fn remove_subscriber(
        &self,
        room_id: &RoomId,
        client_id: &ParticipantId,
    ) -> Result<Vec<ParticipantId>, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        if !room.remove_subscriber(client_id) {
            tracing::debug!(
                "Subscriber '{}' was not registered in room '{}'",
                client_id,
                room_id
            );
        }
        Ok(room.subscribers.iter().cloned().collect())
    }

    async fn submit(
        &self,
        room_id: &RoomId,
        actor: &ParticipantId,
        base_version: u64,
        document: SharedState,
    ) -> Result<RoomDocument, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        room.apply_submission(actor, base_version, document)?;
        Ok(room.clone())
    }

    async fn sweep(&self, now: Timestamp, expiry_ms: i64) -> Vec<RoomDocument> {
        let mut rooms = self.rooms.lock().await;
        let mut changed: Vec<RoomDocument> = rooms
            .values_mut()
            .filter_map(|room| room.sweep(now, expiry_ms).then(|| room.clone()))
            .collect();
        changed.sort_by(|a, b| a.id.cmp(&b.id));
        changed
    }
}
