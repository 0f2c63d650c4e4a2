//! Server state shared by every handler.

use std::sync::Arc;

use crate::usecase::{
    ConnectSubscriberUseCase, DisconnectSubscriberUseCase, GetRoomDetailUseCase,
    GetRoomsUseCase, SubmitDocumentUseCase,
};

/// Shared application state
pub struct AppState {
    pub connect_subscriber_usecase: Arc<ConnectSubscriberUseCase>,
    pub disconnect_subscriber_usecase: Arc<DisconnectSubscriberUseCase>,
    pub submit_document_usecase: Arc<SubmitDocumentUseCase>,
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
}
