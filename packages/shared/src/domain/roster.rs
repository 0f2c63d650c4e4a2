//! Presence roster rules.
//!
//! Staleness is a read-time concept: nothing here removes records, it only
//! decides which ones are shown and counted.

use std::collections::{BTreeMap, HashSet};

use super::{
    entity::Participant,
    limits::PRESENCE_FRESHNESS_MS,
    value_object::{ParticipantId, Timestamp},
};

/// `true` if the participant is active and heard from within the freshness window.
///
/// A record without `lastSeen` counts as fresh.
pub fn is_fresh(participant: &Participant, now: Timestamp) -> bool {
    participant.is_active
        && participant
            .last_seen
            .is_none_or(|seen| seen.age_at(now) < PRESENCE_FRESHNESS_MS)
}

/// Fresh participants in map order (ascending participant id).
pub fn fresh_participants(
    users: &BTreeMap<ParticipantId, Participant>,
    now: Timestamp,
) -> Vec<&Participant> {
    users.values().filter(|p| is_fresh(p, now)).collect()
}

/// Participants to display: fresh ones, de-duplicated by display name.
///
/// The first record in map order wins a name, which hides duplicate records
/// left behind by stale local storage.
pub fn compute_active_roster(
    users: &BTreeMap<ParticipantId, Participant>,
    now: Timestamp,
) -> Vec<Participant> {
    let mut seen_names = HashSet::new();
    fresh_participants(users, now)
        .into_iter()
        .filter(|p| !p.name.is_empty() && seen_names.insert(p.name.as_str()))
        .cloned()
        .collect()
}

/// Case-insensitive name collision against fresh participants other than `except`.
pub fn is_name_taken(
    users: &BTreeMap<ParticipantId, Participant>,
    name: &str,
    now: Timestamp,
    except: &ParticipantId,
) -> bool {
    let wanted = name.to_lowercase();
    fresh_participants(users, now)
        .into_iter()
        .any(|p| &p.id != except && p.name.to_lowercase() == wanted)
}

/// Number of fresh participants other than `except`.
pub fn count_fresh_others(
    users: &BTreeMap<ParticipantId, Participant>,
    now: Timestamp,
    except: &ParticipantId,
) -> usize {
    fresh_participants(users, now)
        .into_iter()
        .filter(|p| &p.id != except)
        .count()
}
