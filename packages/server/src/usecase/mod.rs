//! UseCase 層: ルーム文書の中継に関するアプリケーションロジック

mod broadcast;
pub mod connect_subscriber;
pub mod disconnect_subscriber;
pub mod error;
pub mod get_room_detail;
pub mod get_rooms;
pub mod submit_document;
pub mod sweep_presence;

pub use connect_subscriber::ConnectSubscriberUseCase;
pub use disconnect_subscriber::DisconnectSubscriberUseCase;
pub use error::{ConnectError, DisconnectError, GetRoomDetailError, SubmitError};
pub use get_room_detail::GetRoomDetailUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use submit_document::SubmitDocumentUseCase;
pub use sweep_presence::SweepPresenceUseCase;
