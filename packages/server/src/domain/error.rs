//! Errors of the server domain.

use thiserror::Error;
use yoriai_shared::domain::PolicyViolation;

/// Why a submitted document was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("document is based on version {base} but the room is at version {current}")]
    Conflict { base: u64, current: u64 },

    #[error("policy violation: {0}")]
    Policy(#[from] PolicyViolation),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("'{0}' is already subscribed to this room")]
    DuplicateSubscriber(String),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
