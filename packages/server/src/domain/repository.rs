//! Repository trait 定義
//!
//! ユースケース層が必要とするルーム文書ストアへのインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use yoriai_shared::domain::{ParticipantId, RoomId, SharedState, Timestamp};

use super::{RepositoryError, RoomDocument};

/// Room Repository trait
///
/// すべての更新はルーム単位で原子的に適用されること。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// ルームを取得し、存在しなければ `now` 時点で作成する
    async fn get_or_create_room(&self, room_id: &RoomId, now: Timestamp) -> RoomDocument;

    /// ルームを取得
    async fn get_room(&self, room_id: &RoomId) -> Result<RoomDocument, RepositoryError>;

    /// 全ルームを ID 順で取得
    async fn list_rooms(&self) -> Vec<RoomDocument>;

    /// 購読者を追加（ルームが無ければ作成する）。追加後のルームを返す
    async fn add_subscriber(
        &self,
        room_id: &RoomId,
        client_id: ParticipantId,
        now: Timestamp,
    ) -> Result<RoomDocument, RepositoryError>;

    /// 購読者を削除。残りの購読者を返す
    async fn remove_subscriber(
        &self,
        room_id: &RoomId,
        client_id: &ParticipantId,
    ) -> Result<Vec<ParticipantId>, RepositoryError>;

    /// `base_version` を前提に文書を差し替える。差し替え後のルームを返す
    async fn submit(
        &self,
        room_id: &RoomId,
        actor: &ParticipantId,
        base_version: u64,
        document: SharedState,
    ) -> Result<RoomDocument, RepositoryError>;

    /// 期限切れのプレゼンスを全ルームから削除。変化したルームを返す
    async fn sweep(&self, now: Timestamp, expiry_ms: i64) -> Vec<RoomDocument>;
}
