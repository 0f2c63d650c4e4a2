//! Live-edit broadcaster: publishes the local draft as ghost text for others.
//!
//! Keystrokes are coalesced to at most one store write per frame. Only the
//! latest draft is kept while a write is pending.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};
use yoriai_shared::{
    domain::{
        LiveEdit, ParticipantId, Profile, SharedState, TaskError, TaskId, Timestamp, can_modify,
        limits::LIVE_EDIT_FRAME_MS,
    },
    time::Clock,
};

use crate::{error::LiveEditError, store::DocumentStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveEditConfig {
    /// Minimum spacing of two broadcasts of the same edit.
    pub frame_interval: Duration,
}

impl Default for LiveEditConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(LIVE_EDIT_FRAME_MS),
        }
    }
}

#[derive(Debug, Clone)]
struct Draft {
    generation: u64,
    task_id: TaskId,
    text: String,
    caret: usize,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    participant_id: ParticipantId,
    profile: Profile,
    /// Bumped by every start and end; drafts of older generations are dropped.
    generation: AtomicU64,
    editing: Mutex<Option<TaskId>>,
    pending: watch::Sender<Option<Draft>>,
    /// Orders writes of live edits against their removal.
    write_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    fn editing(&self) -> MutexGuard<'_, Option<TaskId>> {
        self.editing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_edit(&self, task_id: TaskId, text: String, caret: usize) -> LiveEdit {
        LiveEdit {
            task_id,
            user_id: self.participant_id.clone(),
            text,
            caret,
            name: self.profile.name.clone(),
            initials: self.profile.initials.clone(),
            color: self.profile.color.clone(),
            updated_at: Timestamp::new(self.clock.now_millis()),
        }
    }

    async fn write(&self, draft: Draft) -> Result<(), LiveEditError> {
        let _guard = self.write_lock.lock().await;
        if draft.generation != self.generation.load(Ordering::SeqCst) {
            tracing::debug!("Dropping draft of an ended edit");
            return Ok(());
        }
        let edit = self.live_edit(draft.task_id, draft.text, draft.caret);
        self.store
            .submit(Box::new(move |state: &SharedState| {
                state.with_live_edit(edit.clone())
            }))
            .await?;
        Ok(())
    }
}

pub struct LiveEditBroadcaster {
    inner: Arc<Inner>,
    flusher: JoinHandle<()>,
}

impl LiveEditBroadcaster {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        participant_id: ParticipantId,
        profile: Profile,
        config: LiveEditConfig,
    ) -> Self {
        let (pending, rx) = watch::channel(None);
        let inner = Arc::new(Inner {
            store,
            clock,
            participant_id,
            profile,
            generation: AtomicU64::new(0),
            editing: Mutex::new(None),
            pending,
            write_lock: tokio::sync::Mutex::new(()),
        });
        let flusher = tokio::spawn(flush_loop(inner.clone(), rx, config.frame_interval));
        Self { inner, flusher }
    }

    /// Task currently being edited, if any.
    pub fn editing(&self) -> Option<TaskId> {
        self.inner.editing().clone()
    }

    /// Begin editing `task_id` and publish the initial draft right away.
    ///
    /// Supersedes any previous edit of ours.
    pub async fn start_edit(
        &self,
        task_id: &TaskId,
        text: &str,
        caret: usize,
    ) -> Result<(), LiveEditError> {
        let state = self.inner.store.read().state;
        let task = state
            .task(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.as_str().to_string()))?;
        if !can_modify(task, &self.inner.participant_id) {
            return Err(TaskError::NotAuthorized {
                task_id: task_id.as_str().to_string(),
                actor: self.inner.participant_id.as_str().to_string(),
            }
            .into());
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.pending.send_replace(None);
        *self.inner.editing() = Some(task_id.clone());

        self.inner
            .write(Draft {
                generation,
                task_id: task_id.clone(),
                text: text.to_string(),
                caret,
            })
            .await
    }

    /// Replace the draft of `task_id`. Written on the next frame.
    pub fn push_edit(&self, task_id: &TaskId, text: &str, caret: usize) -> Result<(), LiveEditError> {
        if self.inner.editing().as_ref() != Some(task_id) {
            return Err(LiveEditError::NotEditing);
        }
        self.inner.pending.send_replace(Some(Draft {
            generation: self.inner.generation.load(Ordering::SeqCst),
            task_id: task_id.clone(),
            text: text.to_string(),
            caret,
        }));
        Ok(())
    }

    /// Retract our live edit. Idempotent.
    pub async fn end_edit(&self) -> Result<(), LiveEditError> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.pending.send_replace(None);
        *self.inner.editing() = None;

        let _guard = self.inner.write_lock.lock().await;
        let id = self.inner.participant_id.clone();
        self.inner
            .store
            .submit(Box::new(move |state: &SharedState| state.without_live_edit(&id)))
            .await?;
        Ok(())
    }
}

impl Drop for LiveEditBroadcaster {
    fn drop(&mut self) {
        self.flusher.abort();
    }
}

async fn flush_loop(inner: Arc<Inner>, mut rx: watch::Receiver<Option<Draft>>, frame: Duration) {
    while rx.changed().await.is_ok() {
        // Let further keystrokes of this frame replace the draft
        tokio::time::sleep(frame).await;
        let draft = rx.borrow_and_update().clone();
        if let Some(draft) = draft
            && let Err(e) = inner.write(draft).await
        {
            tracing::warn!("Failed to broadcast live edit: {}", e);
        }
    }
}
