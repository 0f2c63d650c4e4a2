//! Task mutator: add, toggle, edit and delete tasks of the shared list.
//!
//! Each operation is checked against the snapshot the caller sees, then
//! submitted as an updater that re-runs the same rule on whatever snapshot the
//! store applies it to. If the rule no longer holds there, the updater leaves
//! the document unchanged.

use std::sync::Arc;

use yoriai_shared::{
    domain::{ParticipantId, SharedState, Task, TaskError, TaskId, Timestamp, tasks},
    time::Clock,
};

use crate::{error::MutationError, store::DocumentStore};

pub struct TaskMutator {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    actor: ParticipantId,
}

impl TaskMutator {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, actor: ParticipantId) -> Self {
        Self {
            store,
            clock,
            actor,
        }
    }

    /// Append a new incomplete task created by the local participant.
    pub async fn add_task(&self, text: &str) -> Result<Task, MutationError> {
        let now = Timestamp::new(self.clock.now_millis());
        let task = tasks::new_task(text, self.actor.clone(), now).map_err(TaskError::from)?;
        let added = task.clone();
        self.store
            .submit(Box::new(move |state: &SharedState| tasks::append(state, added.clone())))
            .await?;
        tracing::debug!("Added task '{}'", task.id);
        Ok(task)
    }

    /// Flip `completed`. Unknown ids are ignored.
    pub async fn toggle_complete(&self, id: &TaskId) -> Result<(), MutationError> {
        self.apply(id, false, move |state, id, actor| tasks::toggle(state, id, actor))
            .await
    }

    /// Replace the task text.
    pub async fn edit_text(&self, id: &TaskId, text: &str) -> Result<(), MutationError> {
        let text = text.to_string();
        self.apply(id, true, move |state, id, actor| {
            tasks::edit_text(state, id, &text, actor)
        })
        .await
    }

    /// Remove the task. Unknown ids are ignored.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), MutationError> {
        self.apply(id, false, move |state, id, actor| tasks::remove(state, id, actor))
            .await
    }

    async fn apply<F>(&self, id: &TaskId, require_task: bool, rule: F) -> Result<(), MutationError>
    where
        F: Fn(&SharedState, &TaskId, &ParticipantId) -> Result<SharedState, TaskError>
            + Send
            + Sync
            + 'static,
    {
        match rule(&self.store.read().state, id, &self.actor) {
            Ok(_) => {}
            Err(TaskError::NotFound(_)) if !require_task => {
                tracing::debug!("Ignoring mutation of unknown task '{}'", id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let id = id.clone();
        let actor = self.actor.clone();
        self.store
            .submit(Box::new(move |state: &SharedState| {
                rule(state, &id, &actor).unwrap_or_else(|_| state.clone())
            }))
            .await?;
        Ok(())
    }
}
