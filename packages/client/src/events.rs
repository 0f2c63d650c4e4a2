//! Human-readable changes between two room snapshots.

use std::fmt;

use yoriai_shared::domain::{ParticipantId, SharedState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    ParticipantJoined { id: ParticipantId, name: String },
    ParticipantLeft { id: ParticipantId, name: String },
    TaskAdded { text: String, by: String },
    TaskRemoved { text: String },
    TaskCompleted { text: String },
    TaskReopened { text: String },
    TaskRenamed { from: String, to: String },
}

impl fmt::Display for RoomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomEvent::ParticipantJoined { name, .. } => write!(f, "{} joined", name),
            RoomEvent::ParticipantLeft { name, .. } => write!(f, "{} left", name),
            RoomEvent::TaskAdded { text, by } => write!(f, "{} added \"{}\"", by, text),
            RoomEvent::TaskRemoved { text } => write!(f, "\"{}\" was deleted", text),
            RoomEvent::TaskCompleted { text } => write!(f, "\"{}\" was completed", text),
            RoomEvent::TaskReopened { text } => write!(f, "\"{}\" was reopened", text),
            RoomEvent::TaskRenamed { from, to } => {
                write!(f, "\"{}\" was renamed to \"{}\"", from, to)
            }
        }
    }
}

/// Events that turn `before` into `after`.
///
/// Participant events come first in id order, then task events in list order.
/// Heartbeats and live edits produce nothing.
pub fn diff_events(before: &SharedState, after: &SharedState) -> Vec<RoomEvent> {
    let mut events = Vec::new();

    for (id, participant) in &after.users {
        if !before.users.contains_key(id) {
            events.push(RoomEvent::ParticipantJoined {
                id: id.clone(),
                name: participant.name.clone(),
            });
        }
    }
    for (id, participant) in &before.users {
        if !after.users.contains_key(id) {
            events.push(RoomEvent::ParticipantLeft {
                id: id.clone(),
                name: participant.name.clone(),
            });
        }
    }

    for task in &before.tasks {
        if after.task(&task.id).is_none() {
            events.push(RoomEvent::TaskRemoved {
                text: task.text.clone(),
            });
        }
    }
    for task in &after.tasks {
        let Some(old) = before.task(&task.id) else {
            let by = after
                .participant(&task.created_by)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| task.created_by.to_string());
            events.push(RoomEvent::TaskAdded {
                text: task.text.clone(),
                by,
            });
            continue;
        };
        if old.text != task.text {
            events.push(RoomEvent::TaskRenamed {
                from: old.text.clone(),
                to: task.text.clone(),
            });
        }
        match (old.completed, task.completed) {
            (false, true) => events.push(RoomEvent::TaskCompleted {
                text: task.text.clone(),
            }),
            (true, false) => events.push(RoomEvent::TaskReopened {
                text: task.text.clone(),
            }),
            _ => {}
        }
    }

    events
}
