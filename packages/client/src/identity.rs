//! Identity resolver: which room, and who we are in it.

use std::sync::Arc;

use yoriai_shared::domain::{ParticipantId, RoomId};

use crate::{
    error::StorageError,
    storage::{KeyValueStorage, participant_id_key},
};

/// Room and participant id of the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
}

impl Identity {
    /// Shareable address of the room, e.g. `https://todo.example/?roomKey=3fa9c1d2e4`.
    pub fn join_link(&self, base: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}roomKey={}", base, separator, self.room_id)
    }
}

pub struct IdentityResolver {
    storage: Arc<dyn KeyValueStorage>,
}

impl IdentityResolver {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Resolve the room (generating one if none is given or it is invalid) and
    /// the participant id stored for it (generating and persisting one if absent).
    pub fn resolve(&self, requested_room: Option<&str>) -> Result<Identity, StorageError> {
        let room_id = requested_room
            .map(str::trim)
            .filter(|room| !room.is_empty())
            .and_then(|room| match RoomId::new(room.to_string()) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Ignoring room key '{}': {}", room, e);
                    None
                }
            })
            .unwrap_or_else(|| {
                let id = RoomId::generate();
                tracing::info!("Created new room key '{}'", id);
                id
            });

        let key = participant_id_key(room_id.as_str());
        let stored = self
            .storage
            .get(&key)
            .and_then(|id| ParticipantId::new(id).ok());

        let participant_id = match stored {
            Some(id) => id,
            None => {
                let id = ParticipantId::generate();
                self.storage.set(&key, id.as_str())?;
                tracing::debug!("Stored new participant id '{}' for room '{}'", id, room_id);
                id
            }
        };

        Ok(Identity {
            room_id,
            participant_id,
        })
    }
}
