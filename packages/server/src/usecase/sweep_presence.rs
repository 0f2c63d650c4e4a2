//! UseCase: 期限切れプレゼンスの掃除
//!
//! クライアントが退室せずに消えた場合でも、`lastSeen` が `expiry` より古い
//! 参加者レコードとライブ編集を全ルームから取り除く。

use std::{sync::Arc, time::Duration};

use yoriai_shared::domain::Timestamp;

use crate::domain::{MessagePusher, RoomRepository};

use super::broadcast::broadcast_snapshot;

/// プレゼンス掃除のユースケース
pub struct SweepPresenceUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    expiry: Duration,
}

impl SweepPresenceUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        expiry: Duration,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            expiry,
        }
    }

    /// 掃除を実行し、変化したルームの新しいスナップショットを配信する
    ///
    /// # Returns
    ///
    /// 変化したルームの数
    pub async fn execute(&self, now: Timestamp) -> usize {
        let expiry_ms = i64::try_from(self.expiry.as_millis()).unwrap_or(i64::MAX);
        let changed = self.repository.sweep(now, expiry_ms).await;

        for room in &changed {
            tracing::info!(
                "Swept expired presence in room '{}' (version {})",
                room.id,
                room.version
            );
            if let Err(e) = broadcast_snapshot(self.message_pusher.as_ref(), room).await {
                tracing::warn!("Failed to broadcast swept room '{}': {}", room.id, e);
            }
        }

        changed.len()
    }
}
