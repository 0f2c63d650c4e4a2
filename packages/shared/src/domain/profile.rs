//! Presentation attributes a participant chooses (or is given) at join time.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{
    entity::Participant,
    error::ValidationError,
    value_object::{DisplayName, ParticipantId, Timestamp},
};

/// Avatar colours handed out at join time.
pub const PALETTE: [&str; 10] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#06b6d4", "#3b82f6", "#8b5cf6", "#ec4899",
    "#10b981", "#f59e0b",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub color: String,
    pub initials: String,
}

impl Profile {
    /// Validate `raw_name` and derive initials and a random palette colour.
    pub fn new(raw_name: &str) -> Result<Self, ValidationError> {
        let color = PALETTE
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(PALETTE[0]);
        Self::with_color(raw_name, color)
    }

    pub fn with_color(raw_name: &str, color: &str) -> Result<Self, ValidationError> {
        let name = DisplayName::parse(raw_name)?;
        Ok(Self {
            initials: initials(name.as_str()),
            name: name.into_string(),
            color: color.to_string(),
        })
    }

    /// Presence record for this profile, fresh as of `now`.
    pub fn to_participant(&self, id: ParticipantId, now: Timestamp) -> Participant {
        Participant {
            id,
            name: self.name.clone(),
            color: self.color.clone(),
            initials: self.initials.clone(),
            is_active: true,
            last_seen: Some(now),
        }
    }
}

impl From<&Participant> for Profile {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            color: participant.color.clone(),
            initials: participant.initials.clone(),
        }
    }
}

/// First character of each space-separated word, upper-cased, at most two.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}
