//! Server-side domain: the room aggregate and the ports the use cases depend on.

pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod room;

pub use error::{RepositoryError, SubmissionError};
pub use message_pusher::{MessagePushError, MessagePusher, PusherChannel, SubscriberKey};
pub use repository::RoomRepository;
pub use room::RoomDocument;

// Document model shared with the client
pub use yoriai_shared::domain::{
    ParticipantId, PolicyViolation, RoomId, SharedState, Timestamp,
};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::MockRoomRepository;
