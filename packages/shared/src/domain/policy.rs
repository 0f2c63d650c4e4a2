//! Transition policy enforced by the relay server on every submission.
//!
//! Clients replace the whole document, so the server compares the stored
//! document with the proposed one and refuses changes the submitting
//! participant is not entitled to make.

use std::collections::{BTreeMap, HashMap};

use super::{
    entity::{SharedState, Task},
    error::PolicyViolation,
    value_object::ParticipantId,
};

/// Check that `actor` may turn `before` into `after`.
pub fn check_transition(
    before: &SharedState,
    after: &SharedState,
    actor: &ParticipantId,
) -> Result<(), PolicyViolation> {
    check_tasks(before, after, actor)?;
    check_owned_map(
        &before.users,
        &after.users,
        actor,
        |record| &record.id,
        |owner, actor| PolicyViolation::ForeignPresence { owner, actor },
    )?;
    check_owned_map(
        &before.live.edits,
        &after.live.edits,
        actor,
        |edit| &edit.user_id,
        |owner, actor| PolicyViolation::ForeignLiveEdit { owner, actor },
    )?;
    Ok(())
}

fn check_tasks(
    before: &SharedState,
    after: &SharedState,
    actor: &ParticipantId,
) -> Result<(), PolicyViolation> {
    let mut proposed: HashMap<&str, &Task> = HashMap::with_capacity(after.tasks.len());
    for task in &after.tasks {
        if proposed.insert(task.id.as_str(), task).is_some() {
            return Err(PolicyViolation::DuplicateTask(task.id.as_str().to_string()));
        }
    }
    let existing: HashMap<&str, &Task> = before.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let entitled = |task: &Task| task.is_system() || &task.created_by == actor;

    for (id, old) in &existing {
        match proposed.get(id) {
            None if !entitled(*old) => {
                return Err(PolicyViolation::ForeignTaskRemoved {
                    task_id: id.to_string(),
                    actor: actor.as_str().to_string(),
                });
            }
            None => {}
            Some(new) => {
                if new.created_by != old.created_by {
                    return Err(PolicyViolation::ImmutableFieldChanged {
                        task_id: id.to_string(),
                        field: "createdBy",
                    });
                }
                if new.created_at != old.created_at {
                    return Err(PolicyViolation::ImmutableFieldChanged {
                        task_id: id.to_string(),
                        field: "createdAt",
                    });
                }
                if new != old && !entitled(*old) {
                    return Err(PolicyViolation::ForeignTaskModified {
                        task_id: id.to_string(),
                        actor: actor.as_str().to_string(),
                    });
                }
            }
        }
    }

    for (id, new) in &proposed {
        if !existing.contains_key(id) && (new.is_system() || &new.created_by != actor) {
            return Err(PolicyViolation::ForgedAuthor {
                task_id: id.to_string(),
                claimed: new.created_by.as_str().to_string(),
                actor: actor.as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// Entries keyed by participant id may only change under the actor's own key,
/// and a changed entry must name its key as its owner.
fn check_owned_map<V, O, E>(
    before: &BTreeMap<ParticipantId, V>,
    after: &BTreeMap<ParticipantId, V>,
    actor: &ParticipantId,
    owner_of: O,
    violation: E,
) -> Result<(), PolicyViolation>
where
    V: PartialEq,
    O: Fn(&V) -> &ParticipantId,
    E: Fn(String, String) -> PolicyViolation,
{
    let keys = before.keys().chain(after.keys());
    for owner in keys {
        let proposed = after.get(owner);
        if before.get(owner) == proposed {
            continue;
        }
        if owner != actor {
            return Err(violation(
                owner.as_str().to_string(),
                actor.as_str().to_string(),
            ));
        }
        if let Some(entry) = proposed
            && owner_of(entry) != owner
        {
            return Err(PolicyViolation::MismatchedOwner {
                key: owner.as_str().to_string(),
                claimed: owner_of(entry).as_str().to_string(),
            });
        }
    }
    Ok(())
}
