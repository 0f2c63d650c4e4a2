use yoriai_shared::protocol::ServerMessage;

use crate::domain::{MessagePushError, MessagePusher, RoomDocument, SubscriberKey};

pub(crate) fn snapshot_message(room: &RoomDocument) -> ServerMessage {
    ServerMessage::Snapshot {
        room_id: room.id.clone(),
        version: room.version,
        document: room.state.clone(),
    }
}

pub(crate) fn subscriber_keys(room: &RoomDocument) -> Vec<SubscriberKey> {
    room.subscribers
        .iter()
        .map(|id| SubscriberKey::new(room.id.clone(), id.clone()))
        .collect()
}

/// 現在の文書をルームの全購読者に送る
pub(crate) async fn broadcast_snapshot(
    pusher: &dyn MessagePusher,
    room: &RoomDocument,
) -> Result<(), MessagePushError> {
    let json = snapshot_message(room)
        .to_json()
        .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
    pusher.broadcast(subscriber_keys(room), &json).await
}
