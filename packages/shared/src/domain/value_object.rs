//! Value objects of the room document.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    error::ValidationError,
    limits::{ID_MAX_CHARS, NAME_MAX_CHARS, NAME_MIN_CHARS, SYSTEM_AUTHOR},
};

/// Ids travel unescaped in query strings and join links: `[A-Za-z0-9_-]{1,64}`.
fn validate_id(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value.len() <= ID_MAX_CHARS
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidId(value.to_string()))
    }
}

fn short_uuid(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_string()
}

/// Stable per-room participant identifier.
///
/// The reserved value `"system"` stands for the seeding author of onboarding
/// tasks. It is only produced by [`ParticipantId::system`], never accepted by
/// [`ParticipantId::new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: String) -> Result<Self, ValidationError> {
        validate_id(&value)?;
        if value == SYSTEM_AUTHOR {
            return Err(ValidationError::ReservedId(value));
        }
        Ok(Self(value))
    }

    /// Generate a fresh id (`user_` followed by 9 hex characters).
    pub fn generate() -> Self {
        Self(format!("user_{}", short_uuid(9)))
    }

    pub fn system() -> Self {
        Self(SYSTEM_AUTHOR.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_AUTHOR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque room key shared through the join link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValidationError> {
        validate_id(&value)?;
        Ok(Self(value))
    }

    pub fn generate() -> Self {
        Self(short_uuid(10))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(format!("task_{}", short_uuid(12)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `self` until `now` (negative if `self` is in the future).
    ///
    /// Saturates at the `i64` bounds; client-supplied timestamps are arbitrary.
    pub fn age_at(&self, now: Timestamp) -> i64 {
        now.0.saturating_sub(self.0)
    }
}

/// Trimmed display name of 2–20 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let chars = trimmed.chars().count();
        if chars == 0 {
            return Err(ValidationError::EmptyName);
        }
        if chars < NAME_MIN_CHARS {
            return Err(ValidationError::NameTooShort);
        }
        if chars > NAME_MAX_CHARS {
            return Err(ValidationError::NameTooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Non-empty, trimmed task text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskText(String);

impl TaskText {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTaskText);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
