//! Ghost text: which remote live edits are worth rendering for a task.

use std::collections::BTreeMap;

use super::{
    entity::LiveEdit,
    limits::LIVE_EDIT_TTL_MS,
    value_object::{ParticipantId, TaskId, Timestamp},
};

/// Remote live edits of `task_id` that are still relevant.
///
/// Excludes the local participant's own edit, edits whose age reached the
/// TTL, and drafts identical to the committed text. The result is ordered by
/// `updatedAt` ascending, ties broken by participant id, so the earliest
/// editor is rendered inline and every editor feeds the typing indicator.
pub fn ghosts_for_task<'a>(
    task_id: &TaskId,
    edits: &'a BTreeMap<ParticipantId, LiveEdit>,
    local: Option<&ParticipantId>,
    committed_text: &str,
    now: Timestamp,
) -> Vec<&'a LiveEdit> {
    let mut ghosts: Vec<&LiveEdit> = edits
        .iter()
        .filter(|(owner, _)| Some(*owner) != local)
        .map(|(_, edit)| edit)
        .filter(|edit| &edit.task_id == task_id)
        .filter(|edit| edit.updated_at.age_at(now) < LIVE_EDIT_TTL_MS)
        .filter(|edit| edit.text != committed_text)
        .collect();
    ghosts.sort_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ghosts
}

/// A draft split at its caret, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostText<'a> {
    pub before: &'a str,
    pub after: &'a str,
}

/// Split `text` at the character offset `caret`, clamped to the text length.
pub fn render_ghost(text: &str, caret: usize) -> GhostText<'_> {
    let split = text
        .char_indices()
        .nth(caret)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len());
    let (before, after) = text.split_at(split);
    GhostText { before, after }
}
