//! UseCase: 購読者切断処理
//!
//! 送信チャンネルの登録を解除するだけで、文書中のプレゼンスには触れない。
//! 明示的な退室はクライアントが文書を提出して行い、それ以外は期限切れで掃除される。

use std::sync::Arc;

use yoriai_shared::domain::{ParticipantId, RoomId};

use crate::domain::{MessagePusher, RepositoryError, RoomRepository, SubscriberKey};

use super::error::DisconnectError;

/// 購読者切断のユースケース
pub struct DisconnectSubscriberUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectSubscriberUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 購読者切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ParticipantId>)` - ルームに残っている購読者
    /// * `Err(DisconnectError)` - ルームが存在しない
    pub async fn execute(
        &self,
        room_id: RoomId,
        client_id: ParticipantId,
    ) -> Result<Vec<ParticipantId>, DisconnectError> {
        let key = SubscriberKey::new(room_id.clone(), client_id.clone());
        self.message_pusher.unregister_client(&key).await;

        self.repository
            .remove_subscriber(&room_id, &client_id)
            .await
            .map_err(|e| match e {
                RepositoryError::RoomNotFound(id) => DisconnectError::RoomNotFound(id),
                other => DisconnectError::RoomNotFound(other.to_string()),
            })
    }
}
