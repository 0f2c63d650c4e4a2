//! UseCase: 購読者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSubscriberUseCase::execute() メソッド
//! - ルームの遅延作成、重複購読の拒否、初回スナップショットの送信
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ルームへの最初の接続
//! - 異常系：同じ client_id での二重接続

use std::sync::Arc;

use yoriai_shared::{
    domain::{ParticipantId, RoomId, Timestamp},
    time::Clock,
};

use crate::domain::{
    MessagePusher, PusherChannel, RepositoryError, RoomDocument, RoomRepository, SubscriberKey,
};

use super::{broadcast::snapshot_message, error::ConnectError};

/// 購読者接続のユースケース
pub struct ConnectSubscriberUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectSubscriberUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// 購読者接続を実行
    ///
    /// ルームが無ければ作成し、`sender` を登録して現在のスナップショットを送る。
    ///
    /// # Returns
    ///
    /// * `Ok(RoomDocument)` - 送信したスナップショットの元になったルーム
    /// * `Err(ConnectError)` - 二重接続など
    pub async fn execute(
        &self,
        room_id: RoomId,
        client_id: ParticipantId,
        sender: PusherChannel,
    ) -> Result<RoomDocument, ConnectError> {
        let now = Timestamp::new(self.clock.now_millis());

        // 1. Repository に購読者を追加（重複チェックを含む）
        match self
            .repository
            .add_subscriber(&room_id, client_id.clone(), now)
            .await
        {
            Ok(_) => {}
            Err(RepositoryError::DuplicateSubscriber(id)) => {
                return Err(ConnectError::DuplicateClientId(id));
            }
            Err(e) => return Err(ConnectError::SnapshotFailed(e.to_string())),
        }

        // 2. MessagePusher に登録
        let key = SubscriberKey::new(room_id.clone(), client_id);
        self.message_pusher.register_client(key.clone(), sender).await;

        // 3. 登録後の最新の文書を送る。これ以降の変更はブロードキャストで届く
        let room = self
            .repository
            .get_room(&room_id)
            .await
            .map_err(|e| ConnectError::SnapshotFailed(e.to_string()))?;
        let json = snapshot_message(&room)
            .to_json()
            .map_err(|e| ConnectError::SnapshotFailed(e.to_string()))?;
        self.message_pusher
            .push_to(&key, &json)
            .await
            .map_err(|e| ConnectError::SnapshotFailed(e.to_string()))?;

        Ok(room)
    }
}
