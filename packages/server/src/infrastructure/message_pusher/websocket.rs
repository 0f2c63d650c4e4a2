//! WebSocket を使った MessagePusher 実装
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信にだけ使用します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MessagePushError, MessagePusher, PusherChannel, SubscriberKey};

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中の購読者の WebSocket sender
    clients: Arc<Mutex<HashMap<SubscriberKey, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, key: SubscriberKey, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Subscriber '{}' registered to MessagePusher", key);
        clients.insert(key, sender);
    }

    async fn unregister_client(&self, key: &SubscriberKey) {
        let mut clients = self.clients.lock().await;
        clients.remove(key);
        tracing::debug!("Subscriber '{}' unregistered from MessagePusher", key);
    }

    async fn push_to(&self, key: &SubscriberKey, content: &str) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(key)
            .ok_or_else(|| MessagePushError::ClientNotFound(key.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to subscriber '{}'", key);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<SubscriberKey>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => {
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!("Failed to push message to subscriber '{}': {}", target, e);
                    }
                }
                None => {
                    tracing::warn!("Subscriber '{}' not found during broadcast, skipping", target);
                }
            }
        }

        Ok(())
    }
}
