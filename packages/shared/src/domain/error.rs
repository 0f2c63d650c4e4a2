//! Domain errors.

use thiserror::Error;

use super::limits::{NAME_MAX_CHARS, NAME_MIN_CHARS};

/// Validation failures of user input.
///
/// The messages are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    EmptyName,

    #[error("Name must be at least {} characters long", NAME_MIN_CHARS)]
    NameTooShort,

    #[error("Name must be at most {} characters long", NAME_MAX_CHARS)]
    NameTooLong,

    #[error("This name is already taken. Please choose a different name.")]
    NameTaken,

    #[error("Task text must not be empty")]
    EmptyTaskText,

    #[error("Invalid identifier: '{0}'")]
    InvalidId(String),

    #[error("Identifier '{0}' is reserved")]
    ReservedId(String),
}

/// Task mutation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task '{0}' not found")]
    NotFound(String),

    #[error("'{actor}' is not allowed to modify task '{task_id}'")]
    NotAuthorized { task_id: String, actor: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Reasons a submitted document transition is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("task '{task_id}' was removed by '{actor}' who did not create it")]
    ForeignTaskRemoved { task_id: String, actor: String },

    #[error("task '{task_id}' was modified by '{actor}' who did not create it")]
    ForeignTaskModified { task_id: String, actor: String },

    #[error("task '{task_id}' changed its immutable field '{field}'")]
    ImmutableFieldChanged { task_id: String, field: &'static str },

    #[error("task '{task_id}' was created on behalf of '{claimed}' by '{actor}'")]
    ForgedAuthor {
        task_id: String,
        claimed: String,
        actor: String,
    },

    #[error("'{actor}' touched the presence record of '{owner}'")]
    ForeignPresence { owner: String, actor: String },

    #[error("'{actor}' touched the live edit of '{owner}'")]
    ForeignLiveEdit { owner: String, actor: String },

    #[error("task '{0}' appears more than once")]
    DuplicateTask(String),

    #[error("record under '{key}' claims to belong to '{claimed}'")]
    MismatchedOwner { key: String, claimed: String },
}
