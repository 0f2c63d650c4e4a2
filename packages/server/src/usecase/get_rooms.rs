//! UseCase: ルーム一覧の取得

use std::sync::Arc;

use crate::domain::{RoomDocument, RoomRepository};

pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// ルーム ID 順の一覧
    pub async fn execute(&self) -> Vec<RoomDocument> {
        self.repository.list_rooms().await
    }
}
