//! Entities of the room document.
//!
//! `SharedState` is treated as copy-on-write: the `with_*` / `without_*`
//! helpers return a new document and never modify the receiver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value_object::{ParticipantId, TaskId, Timestamp};

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: Timestamp,
    pub created_by: ParticipantId,
}

impl Task {
    pub fn new(id: TaskId, text: String, created_by: ParticipantId, created_at: Timestamp) -> Self {
        Self {
            id,
            text,
            description: None,
            completed: false,
            created_at,
            created_by,
        }
    }

    pub fn is_system(&self) -> bool {
        self.created_by.is_system()
    }
}

/// A joined user of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub initials: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<Timestamp>,
}

/// In-progress edit broadcast by one participant.
///
/// `caret` is a character offset into `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEdit {
    pub task_id: TaskId,
    pub user_id: ParticipantId,
    pub text: String,
    pub caret: usize,
    pub name: String,
    #[serde(default)]
    pub initials: String,
    pub color: String,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    #[serde(default)]
    pub edits: BTreeMap<ParticipantId, LiveEdit>,
}

/// The whole room document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub users: BTreeMap<ParticipantId, Participant>,
    #[serde(default)]
    pub live: LiveState,
}

impl SharedState {
    /// Document of a freshly created room, with the two onboarding tasks.
    pub fn seeded(now: Timestamp) -> Self {
        let welcome = |id: &str, text: &str| {
            Task::new(
                TaskId::new(id),
                text.to_string(),
                ParticipantId::system(),
                now,
            )
        };
        Self {
            tasks: vec![
                welcome("welcome-1", "Welcome to your collaborative to-do list!"),
                welcome("welcome-2", "Share the room link to collaborate with others"),
            ],
            ..Self::default()
        }
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.users.get(id)
    }

    pub fn live_edit(&self, id: &ParticipantId) -> Option<&LiveEdit> {
        self.live.edits.get(id)
    }

    pub fn with_tasks(&self, tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..self.clone()
        }
    }

    /// Insert or replace the record keyed by `participant.id`.
    pub fn with_participant(&self, participant: Participant) -> Self {
        let mut next = self.clone();
        next.users.insert(participant.id.clone(), participant);
        next
    }

    pub fn without_participant(&self, id: &ParticipantId) -> Self {
        let mut next = self.clone();
        next.users.remove(id);
        next
    }

    /// Refresh `lastSeen` and reassert `isActive`. `None` if there is no record for `id`.
    pub fn with_heartbeat(&self, id: &ParticipantId, now: Timestamp) -> Option<Self> {
        let current = self.users.get(id)?;
        Some(self.with_participant(Participant {
            is_active: true,
            last_seen: Some(now),
            ..current.clone()
        }))
    }

    pub fn with_live_edit(&self, edit: LiveEdit) -> Self {
        let mut next = self.clone();
        next.live.edits.insert(edit.user_id.clone(), edit);
        next
    }

    pub fn without_live_edit(&self, id: &ParticipantId) -> Self {
        let mut next = self.clone();
        next.live.edits.remove(id);
        next
    }

    /// Drop presence records and live edits that have outlived `expiry_ms`.
    ///
    /// A timestamp more than `expiry_ms` ahead of `now` counts as expired too.
    /// Records without `lastSeen` are kept. Live edits of removed participants
    /// go with them. Returns `None` when nothing expired.
    pub fn swept(&self, now: Timestamp, expiry_ms: i64) -> Option<Self> {
        let expired = |seen: Option<Timestamp>| {
            seen.is_some_and(|t| t.age_at(now).saturating_abs() >= expiry_ms)
        };

        let mut next = self.clone();
        let SharedState { users, live, .. } = &mut next;
        users.retain(|_, p| !expired(p.last_seen));
        live.edits
            .retain(|id, edit| users.contains_key(id) && !expired(Some(edit.updated_at)));

        if next == *self { None } else { Some(next) }
    }
}
