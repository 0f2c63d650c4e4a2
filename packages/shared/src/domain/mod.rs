//! Room document model and the pure rules applied to it.
//!
//! Nothing in this module performs I/O. Every operation reads a snapshot and
//! returns a new one, so the same functions run on the client (before a
//! submission) and on the relay server (when checking one).

pub mod entity;
pub mod error;
pub mod ghost;
pub mod limits;
pub mod policy;
pub mod profile;
pub mod roster;
pub mod tasks;
pub mod value_object;

pub use entity::{LiveEdit, LiveState, Participant, SharedState, Task};
pub use error::{PolicyViolation, TaskError, ValidationError};
pub use ghost::{GhostText, ghosts_for_task, render_ghost};
pub use policy::check_transition;
pub use profile::Profile;
pub use roster::{
    compute_active_roster, count_fresh_others, fresh_participants, is_fresh, is_name_taken,
};
pub use tasks::{TaskSections, can_modify, task_sections};
pub use value_object::{DisplayName, ParticipantId, RoomId, TaskId, TaskText, Timestamp};
