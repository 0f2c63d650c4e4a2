//! Text formatting for the terminal client.

use yoriai_shared::{
    domain::{
        ParticipantId, SharedState, Task, Timestamp, can_modify, ghosts_for_task, render_ghost,
        task_sections,
    },
    time::timestamp_to_local_time,
};

use crate::{events::RoomEvent, presence::PresenceView, store::ConnectionState};

const RULE: &str = "============================================================";

pub const HELP: &str = "\
Commands:
  /join <name>    join the room under <name>
  /leave          leave the room
  /add <text>     add a task (plain text does the same)
  /done <n>       toggle completion of task <n>
  /edit <n>       start editing task <n>
  /draft <text>   replace the draft of the task being edited
  /save           save the draft
  /cancel         discard the draft
  /rm <n>         delete task <n>
  /list           show the task list
  /who            show who is here
  /link           show the link to share this room
  /help           show this help
  /quit           leave and exit
";

/// Formatter for room state shown in the terminal
pub struct RoomFormatter;

impl RoomFormatter {
    /// Format the sectioned task list with inline ghost text
    ///
    /// # Arguments
    ///
    /// * `state` - Room document to render
    /// * `local` - The local participant (to mark own tasks and hide own drafts)
    /// * `now` - Current time, for the live-edit TTL
    ///
    /// # Returns
    ///
    /// A formatted string with numbered tasks, numbers matching the task commands
    pub fn format_task_list(state: &SharedState, local: &ParticipantId, now: Timestamp) -> String {
        let sections = task_sections(&state.tasks);
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));

        let mut number = 0;
        for (title, tasks) in [("Getting Started", &sections.system), ("All Tasks", &sections.user)] {
            output.push_str(&format!("{}\n", title));
            if tasks.is_empty() {
                output.push_str("  (no tasks)\n");
            }
            for task in tasks {
                number += 1;
                output.push_str(&Self::format_task_line(number, task, state, local));
                let ghosts = ghosts_for_task(&task.id, &state.live.edits, Some(local), &task.text, now);
                if let Some(first) = ghosts.first() {
                    let ghost = render_ghost(&first.text, first.caret);
                    output.push_str(&format!(
                        "       ~ {}: {}|{}\n",
                        first.name, ghost.before, ghost.after
                    ));
                }
            }
        }

        output.push_str(&format!("{}\n", RULE));
        output
    }

    fn format_task_line(
        number: usize,
        task: &Task,
        state: &SharedState,
        local: &ParticipantId,
    ) -> String {
        let check = if task.completed { "x" } else { " " };
        let author = if task.is_system() {
            String::new()
        } else if &task.created_by == local {
            " (me)".to_string()
        } else {
            let name = state
                .participant(&task.created_by)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| task.created_by.to_string());
            format!(" ({})", name)
        };
        let lock = if can_modify(task, local) { "" } else { " [read-only]" };
        format!("  {:>2}. [{}] {}{}{}\n", number, check, task.text, author, lock)
    }

    /// Format the participant list
    ///
    /// # Arguments
    ///
    /// * `view` - Roster split into the local participant and the others
    ///
    /// # Returns
    ///
    /// A formatted string with one participant per line
    pub fn format_roster(view: &PresenceView) -> String {
        let mut output = format!("\nParticipants ({}):\n", view.total);
        if view.total == 0 {
            output.push_str("  (nobody has joined yet)\n");
        }
        if let Some(me) = &view.me {
            output.push_str(&format!("  [{}] {} (me)\n", me.initials, me.name));
        }
        for other in &view.others {
            let seen = other
                .last_seen
                .map(|t| format!(" - last seen {}", timestamp_to_local_time(t.value())))
                .unwrap_or_default();
            output.push_str(&format!("  [{}] {}{}\n", other.initials, other.name, seen));
        }
        output
    }

    /// Format a room change notification
    pub fn format_event(event: &RoomEvent) -> String {
        let marker = match event {
            RoomEvent::ParticipantJoined { .. } | RoomEvent::TaskAdded { .. } => '+',
            RoomEvent::ParticipantLeft { .. } | RoomEvent::TaskRemoved { .. } => '-',
            _ => '*',
        };
        format!("{} {}\n", marker, event)
    }

    /// Typing indicators of remote participants, one per editor
    ///
    /// # Arguments
    ///
    /// * `state` - Room document
    /// * `local` - The local participant, whose own draft is never listed
    /// * `now` - Current time, for the live-edit TTL
    ///
    /// # Returns
    ///
    /// Lines like `Bob is typing in "Buy milk"`, in task list order
    pub fn typing_indicators(
        state: &SharedState,
        local: &ParticipantId,
        now: Timestamp,
    ) -> Vec<String> {
        task_sections(&state.tasks)
            .iter()
            .flat_map(|task| {
                ghosts_for_task(&task.id, &state.live.edits, Some(local), &task.text, now)
                    .into_iter()
                    .map(move |edit| format!("{} is typing in \"{}\"", edit.name, task.text))
            })
            .collect()
    }

    /// Format the connection indicator
    pub fn format_connection(state: ConnectionState) -> String {
        match state {
            ConnectionState::Connected => "[online] Connected".to_string(),
            ConnectionState::Reconnecting { attempt } => {
                format!("[offline] Reconnecting (attempt {})", attempt)
            }
            ConnectionState::Disconnected => "[offline] Disconnected".to_string(),
        }
    }
}
