//! UseCase: 文書提出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SubmitDocumentUseCase::execute() メソッド
//! - バージョン検査、ポリシー検査、受理後のブロードキャストと提出者への応答
//!
//! ### どのような状況を想定しているか
//! - 正常系：受理され全購読者にスナップショット、提出者に accepted
//! - 異常系：古いバージョン（conflict）、他人のタスク削除（policy）
//! - 異常系：解析できないフレーム（malformed）

use std::sync::Arc;

use yoriai_shared::{
    domain::{ParticipantId, RoomId, SharedState},
    protocol::{RejectReason, ServerMessage},
};

use crate::domain::{
    MessagePusher, RepositoryError, RoomRepository, SubmissionError, SubscriberKey,
};

use super::{broadcast::broadcast_snapshot, error::SubmitError};

/// 文書提出のユースケース
pub struct SubmitDocumentUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SubmitDocumentUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 文書提出を実行
    ///
    /// 受理した場合は新しいスナップショットをルームの全購読者へ送り、その後に
    /// 提出者へ `accepted` を送る。拒否した場合は提出者へ `rejected` を送る。
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - 保存後のバージョン
    /// * `Err(SubmitError)` - 拒否理由
    pub async fn execute(
        &self,
        room_id: RoomId,
        client_id: ParticipantId,
        request_id: String,
        base_version: u64,
        document: SharedState,
    ) -> Result<u64, SubmitError> {
        let key = SubscriberKey::new(room_id.clone(), client_id.clone());

        let result = self
            .repository
            .submit(&room_id, &client_id, base_version, document)
            .await;

        let room = match result {
            Ok(room) => room,
            Err(e) => {
                let error = self.to_submit_error(&room_id, e).await;
                self.reply_rejected(&key, request_id, &error).await;
                return Err(error);
            }
        };

        tracing::info!(
            "Room '{}' is now at version {} (submitted by '{}')",
            room.id,
            room.version,
            client_id
        );

        if let Err(e) = broadcast_snapshot(self.message_pusher.as_ref(), &room).await {
            tracing::warn!("Failed to broadcast snapshot of room '{}': {}", room.id, e);
        }

        let accepted = ServerMessage::Accepted {
            request_id,
            version: room.version,
        };
        self.reply(&key, &accepted).await?;

        Ok(room.version)
    }

    /// 解析できなかったフレームに `rejected` を返す
    pub async fn reject_malformed(&self, key: &SubscriberKey, message: String) {
        let current_version = self
            .repository
            .get_room(&key.room_id)
            .await
            .map(|room| room.version)
            .unwrap_or_default();
        let rejected = ServerMessage::Rejected {
            request_id: String::new(),
            reason: RejectReason::Malformed,
            message,
            current_version,
        };
        if let Err(e) = self.reply(key, &rejected).await {
            tracing::warn!("Failed to reject malformed frame from '{}': {}", key, e);
        }
    }

    async fn to_submit_error(&self, room_id: &RoomId, error: RepositoryError) -> SubmitError {
        match error {
            RepositoryError::Submission(SubmissionError::Conflict { base, current }) => {
                SubmitError::Conflict { base, current }
            }
            RepositoryError::Submission(SubmissionError::Policy(violation)) => {
                let current = self
                    .repository
                    .get_room(room_id)
                    .await
                    .map(|room| room.version)
                    .unwrap_or_default();
                SubmitError::Policy {
                    message: violation.to_string(),
                    current,
                }
            }
            RepositoryError::RoomNotFound(id) => SubmitError::RoomNotFound(id),
            e @ RepositoryError::DuplicateSubscriber(_) => SubmitError::Internal(e.to_string()),
        }
    }

    async fn reply_rejected(&self, key: &SubscriberKey, request_id: String, error: &SubmitError) {
        let (reason, current_version) = match error {
            SubmitError::Conflict { current, .. } => (RejectReason::Conflict, *current),
            SubmitError::Policy { current, .. } => (RejectReason::Policy, *current),
            SubmitError::RoomNotFound(_) | SubmitError::Internal(_) => (RejectReason::Malformed, 0),
        };
        let rejected = ServerMessage::Rejected {
            request_id,
            reason,
            message: error.to_string(),
            current_version,
        };
        tracing::warn!("Rejected submission from '{}': {}", key, error);
        if let Err(e) = self.reply(key, &rejected).await {
            tracing::warn!("Failed to send rejection to '{}': {}", key, e);
        }
    }

    async fn reply(&self, key: &SubscriberKey, message: &ServerMessage) -> Result<(), SubmitError> {
        let json = message
            .to_json()
            .map_err(|e| SubmitError::Internal(e.to_string()))?;
        if let Err(e) = self.message_pusher.push_to(key, &json).await {
            // 提出者が既に切断していても文書は保存済み
            tracing::debug!("Reply to '{}' was not delivered: {}", key, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MockRoomRepository, Timestamp},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        },
    };
    use tokio::sync::mpsc;
    use yoriai_shared::domain::{Participant, tasks};

    fn room_id() -> RoomId {
        RoomId::new("room1".to_string()).unwrap()
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn presence(id: &str) -> Participant {
        Participant {
            id: pid(id),
            name: id.to_string(),
            color: "#000".to_string(),
            initials: "X".to_string(),
            is_active: true,
            last_seen: Some(Timestamp::new(0)),
        }
    }

    async fn parse_next(rx: &mut mpsc::UnboundedReceiver<String>) -> ServerMessage {
        let json = rx.recv().await.expect("channel closed");
        serde_json::from_str(&json).expect("invalid server message")
    }

    /// 2 人の購読者がいるルームを作る
    async fn setup() -> (
        SubmitDocumentUseCase,
        Arc<InMemoryRoomRepository>,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let repository = Arc::new(InMemoryRoomRepository::new(false));
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        for (id, tx) in [("user_a", tx_a), ("user_b", tx_b)] {
            repository
                .add_subscriber(&room_id(), pid(id), Timestamp::new(0))
                .await
                .unwrap();
            pusher
                .register_client(SubscriberKey::new(room_id(), pid(id)), tx)
                .await;
        }
        let usecase = SubmitDocumentUseCase::new(repository.clone(), pusher);
        (usecase, repository, rx_a, rx_b)
    }

    #[tokio::test]
    async fn test_accepted_submission_is_broadcast() {
        // テスト項目: 受理された文書は全購読者に届き、提出者には accepted も届く
        // given (前提条件):
        let (usecase, _repository, mut rx_a, mut rx_b) = setup().await;
        let document = SharedState::default().with_participant(presence("user_a"));

        // when (操作):
        let result = usecase
            .execute(room_id(), pid("user_a"), "req-1".to_string(), 0, document.clone())
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(1));
        for rx in [&mut rx_a, &mut rx_b] {
            match parse_next(rx).await {
                ServerMessage::Snapshot {
                    version, document: d, ..
                } => {
                    assert_eq!(version, 1);
                    assert_eq!(d, document);
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
        assert_eq!(
            parse_next(&mut rx_a).await,
            ServerMessage::Accepted {
                request_id: "req-1".to_string(),
                version: 1
            }
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_submission_is_rejected_as_conflict() {
        // テスト項目: 古いバージョンに基づく提出は提出者にだけ conflict として返る
        // given (前提条件):
        let (usecase, _repository, mut rx_a, mut rx_b) = setup().await;
        usecase
            .execute(
                room_id(),
                pid("user_a"),
                "req-1".to_string(),
                0,
                SharedState::default().with_participant(presence("user_a")),
            )
            .await
            .unwrap();
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}

        // when (操作):
        let result = usecase
            .execute(
                room_id(),
                pid("user_b"),
                "req-2".to_string(),
                0,
                SharedState::default().with_participant(presence("user_b")),
            )
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SubmitError::Conflict { base: 0, current: 1 }));
        match parse_next(&mut rx_b).await {
            ServerMessage::Rejected {
                request_id,
                reason,
                current_version,
                ..
            } => {
                assert_eq!(request_id, "req-2");
                assert_eq!(reason, RejectReason::Conflict);
                assert_eq!(current_version, 1);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_foreign_task_removal_is_rejected_as_policy() {
        // テスト項目: 他人のタスクの削除は policy として拒否され、文書は変わらない
        // given (前提条件):
        let (usecase, repository, _rx_a, mut rx_b) = setup().await;
        let task = tasks::new_task("Buy milk", pid("user_a"), Timestamp::new(1)).unwrap();
        let with_task = tasks::append(&SharedState::default(), task);
        usecase
            .execute(room_id(), pid("user_a"), "req-1".to_string(), 0, with_task.clone())
            .await
            .unwrap();
        while rx_b.try_recv().is_ok() {}

        // when (操作):
        let result = usecase
            .execute(
                room_id(),
                pid("user_b"),
                "req-2".to_string(),
                1,
                SharedState::default(),
            )
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SubmitError::Policy { current: 1, .. })));
        assert!(matches!(
            parse_next(&mut rx_b).await,
            ServerMessage::Rejected {
                reason: RejectReason::Policy,
                ..
            }
        ));
        let stored = repository.get_room(&room_id()).await.unwrap();
        assert_eq!(stored.state, with_task);
    }

    #[tokio::test]
    async fn test_unknown_room_is_reported() {
        // テスト項目: 存在しないルームへの提出は RoomNotFound
        // given (前提条件):
        let mut repository = MockRoomRepository::new();
        repository
            .expect_submit()
            .returning(|id, _, _, _| Err(RepositoryError::RoomNotFound(id.to_string())));
        let usecase = SubmitDocumentUseCase::new(
            Arc::new(repository),
            Arc::new(WebSocketMessagePusher::new()),
        );

        // when (操作):
        let result = usecase
            .execute(room_id(), pid("user_a"), "req".to_string(), 0, SharedState::default())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SubmitError::RoomNotFound("room1".to_string())));
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_rejected() {
        // テスト項目: 解析できないフレームには malformed の rejected が返る
        // given (前提条件):
        let (usecase, _repository, mut rx_a, _rx_b) = setup().await;

        // when (操作):
        usecase
            .reject_malformed(
                &SubscriberKey::new(room_id(), pid("user_a")),
                "expected value".to_string(),
            )
            .await;

        // then (期待する結果):
        assert!(matches!(
            parse_next(&mut rx_a).await,
            ServerMessage::Rejected {
                reason: RejectReason::Malformed,
                current_version: 0,
                ..
            }
        ));
    }
}
