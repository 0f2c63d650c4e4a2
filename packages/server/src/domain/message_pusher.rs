//! MessagePusher trait 定義
//!
//! 購読者への通知手段の抽象化。WebSocket などの具体的な手段は
//! Infrastructure 層が提供します。

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use yoriai_shared::domain::{ParticipantId, RoomId};

/// 購読者へ JSON 文字列を届けるチャンネル
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// 購読者の識別子。同じ参加者が複数ルームを購読できるため、ルーム ID と組にする
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberKey {
    pub room_id: RoomId,
    pub client_id: ParticipantId,
}

impl SubscriberKey {
    pub fn new(room_id: RoomId, client_id: ParticipantId) -> Self {
        Self { room_id, client_id }
    }
}

impl fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.room_id, self.client_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Subscriber '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 購読者とその送信チャンネルを登録
    async fn register_client(&self, key: SubscriberKey, sender: PusherChannel);

    /// 購読者の登録を解除
    async fn unregister_client(&self, key: &SubscriberKey);

    /// 特定の購読者に送信
    async fn push_to(&self, key: &SubscriberKey, content: &str) -> Result<(), MessagePushError>;

    /// 複数の購読者に送信。一部の失敗は許容する
    async fn broadcast(
        &self,
        targets: Vec<SubscriberKey>,
        content: &str,
    ) -> Result<(), MessagePushError>;
}
