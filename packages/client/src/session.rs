//! Session facade for one participant in one room.

use std::sync::Arc;

use tokio::sync::watch;
use yoriai_shared::{
    domain::{
        LiveEdit, Participant, Profile, TaskId, Timestamp, ghosts_for_task, task_sections,
    },
    time::Clock,
};

use crate::{
    error::{JoinError, SessionError, StorageError},
    identity::Identity,
    live_edit::{LiveEditBroadcaster, LiveEditConfig},
    presence::{
        HeartbeatTask, PresenceConfig, PresenceManager, PresenceStatus, PresenceView,
        presence_view,
    },
    storage::{KeyValueStorage, PROFILE_KEY},
    store::{ConnectionState, DocumentStore, Snapshot},
    tasks::TaskMutator,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub presence: PresenceConfig,
    pub live_edit: LiveEditConfig,
}

/// Draft of the task being edited locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub task_id: TaskId,
    pub text: String,
}

struct Joined {
    profile: Profile,
    _heartbeat: HeartbeatTask,
    live_edit: LiveEditBroadcaster,
    draft: Option<Draft>,
}

/// Everything the local participant does in a room goes through here.
///
/// Timers run only while joined and stop when the session is dropped. Call
/// [`TodoSession::leave`] to remove the presence record as well.
pub struct TodoSession {
    identity: Identity,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    presence: Arc<PresenceManager>,
    tasks: TaskMutator,
    config: SessionConfig,
    joined: Option<Joined>,
    /// Lifecycle phase: `Unjoined`, `Joining`, `Joined` or `Removed`.
    phase: watch::Sender<PresenceStatus>,
}

impl TodoSession {
    pub fn new(
        identity: Identity,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let presence = Arc::new(PresenceManager::new(
            store.clone(),
            clock.clone(),
            identity.participant_id.clone(),
            config.presence,
        ));
        let tasks = TaskMutator::new(store.clone(), clock.clone(), identity.participant_id.clone());
        Self {
            identity,
            store,
            storage,
            clock,
            presence,
            tasks,
            config,
            joined: None,
            phase: watch::Sender::new(PresenceStatus::Unjoined),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.joined.as_ref().map(|joined| &joined.profile)
    }

    pub fn is_joined(&self) -> bool {
        self.joined.is_some()
    }

    /// `Joined` turns into `Stale` while the local record is not fresh.
    pub fn status(&self) -> PresenceStatus {
        match self.joined {
            Some(_) => self.presence.joined_status(),
            None => *self.phase.borrow(),
        }
    }

    /// Receiver notified on every lifecycle change, including `Joining`.
    pub fn watch_status(&self) -> watch::Receiver<PresenceStatus> {
        self.phase.subscribe()
    }

    /// Re-join with the last profile stored on this device.
    ///
    /// Returns `None` when nothing is stored. A stored profile that does not
    /// parse is discarded.
    pub async fn restore(&mut self) -> Result<Option<Participant>, SessionError> {
        let Some(raw) = self.storage.get(PROFILE_KEY) else {
            return Ok(None);
        };
        let profile = match serde_json::from_str::<Profile>(&raw) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Discarding unreadable stored profile: {}", e);
                self.storage.remove(PROFILE_KEY)?;
                return Ok(None);
            }
        };
        tracing::info!("Restoring profile '{}'", profile.name);
        self.join_with(profile).await.map(Some)
    }

    /// Join under `name` with a fresh colour.
    pub async fn join(&mut self, name: &str) -> Result<Participant, SessionError> {
        let profile = Profile::new(name).map_err(JoinError::from)?;
        self.join_with(profile).await
    }

    pub async fn join_with(&mut self, profile: Profile) -> Result<Participant, SessionError> {
        if self.joined.is_some() {
            return Err(JoinError::AlreadyJoined.into());
        }

        let stored = serde_json::to_string(&profile).map_err(StorageError::from)?;
        let previous = self.phase.send_replace(PresenceStatus::Joining);
        let joined: Result<Participant, SessionError> = match self.presence.join(&profile).await {
            Ok(record) => self.storage.set(PROFILE_KEY, &stored).map(|()| record).map_err(Into::into),
            Err(e) => Err(e.into()),
        };
        let record = match joined {
            Ok(record) => record,
            Err(e) => {
                self.phase.send_replace(previous);
                return Err(e);
            }
        };

        let heartbeat = self.presence.spawn_heartbeat(profile.clone());
        let live_edit = LiveEditBroadcaster::new(
            self.store.clone(),
            self.clock.clone(),
            self.identity.participant_id.clone(),
            profile.clone(),
            self.config.live_edit,
        );
        self.joined = Some(Joined {
            profile,
            _heartbeat: heartbeat,
            live_edit,
            draft: None,
        });
        self.phase.send_replace(PresenceStatus::Joined);
        Ok(record)
    }

    /// Stop the timers, retract any live edit and remove our presence record.
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        let joined = self.joined.take().ok_or(SessionError::NotJoined)?;
        self.phase.send_replace(PresenceStatus::Removed);
        self.storage.remove(PROFILE_KEY)?;
        if let Err(e) = joined.live_edit.end_edit().await {
            tracing::warn!("Failed to retract live edit: {}", e);
        }
        drop(joined);
        self.presence.leave().await?;
        Ok(())
    }

    fn joined(&self) -> Result<&Joined, SessionError> {
        self.joined.as_ref().ok_or(SessionError::NotJoined)
    }

    fn joined_mut(&mut self) -> Result<&mut Joined, SessionError> {
        self.joined.as_mut().ok_or(SessionError::NotJoined)
    }

    pub async fn add_task(&self, text: &str) -> Result<TaskId, SessionError> {
        self.joined()?;
        Ok(self.tasks.add_task(text).await?.id)
    }

    pub async fn toggle_task(&self, id: &TaskId) -> Result<(), SessionError> {
        self.joined()?;
        Ok(self.tasks.toggle_complete(id).await?)
    }

    pub async fn edit_task(&self, id: &TaskId, text: &str) -> Result<(), SessionError> {
        self.joined()?;
        Ok(self.tasks.edit_text(id, text).await?)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<(), SessionError> {
        self.joined()?;
        Ok(self.tasks.delete_task(id).await?)
    }

    /// Start editing `id`, publishing its committed text as the first draft.
    pub async fn start_edit(&mut self, id: &TaskId) -> Result<Draft, SessionError> {
        let committed = self
            .store
            .read()
            .state
            .task(id)
            .map(|task| task.text.clone())
            .unwrap_or_default();
        let joined = self.joined_mut()?;
        joined
            .live_edit
            .start_edit(id, &committed, committed.chars().count())
            .await?;
        let draft = Draft {
            task_id: id.clone(),
            text: committed,
        };
        joined.draft = Some(draft.clone());
        Ok(draft)
    }

    /// Replace the draft text, caret at its end.
    pub fn push_edit(&mut self, text: &str) -> Result<(), SessionError> {
        let joined = self.joined_mut()?;
        let draft = joined.draft.as_mut().ok_or(SessionError::NotEditing)?;
        joined
            .live_edit
            .push_edit(&draft.task_id, text, text.chars().count())?;
        draft.text = text.to_string();
        Ok(())
    }

    /// Write the draft as the task text and end the edit.
    pub async fn commit_edit(&mut self) -> Result<TaskId, SessionError> {
        let draft = self
            .joined()?
            .draft
            .clone()
            .ok_or(SessionError::NotEditing)?;
        // A refused commit keeps the draft open
        self.tasks.edit_text(&draft.task_id, &draft.text).await?;
        let joined = self.joined_mut()?;
        joined.draft = None;
        joined.live_edit.end_edit().await?;
        Ok(draft.task_id)
    }

    /// Discard the draft and end the edit.
    pub async fn cancel_edit(&mut self) -> Result<(), SessionError> {
        let joined = self.joined_mut()?;
        joined.draft = None;
        joined.live_edit.end_edit().await?;
        Ok(())
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.joined.as_ref().and_then(|joined| joined.draft.as_ref())
    }

    pub fn roster(&self) -> Vec<Participant> {
        self.presence.roster()
    }

    pub fn presence_view(&self) -> PresenceView {
        presence_view(
            &self.roster(),
            &self.identity.participant_id,
            self.profile(),
        )
    }

    /// Remote drafts of `id` worth rendering, earliest editor first.
    pub fn ghosts(&self, id: &TaskId) -> Vec<LiveEdit> {
        let state = self.store.read().state;
        let committed = state.task(id).map(|t| t.text.as_str()).unwrap_or_default();
        ghosts_for_task(
            id,
            &state.live.edits,
            Some(&self.identity.participant_id),
            committed,
            Timestamp::new(self.clock.now_millis()),
        )
        .into_iter()
        .cloned()
        .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.read()
    }

    /// Task id at 1-based position `number` of the sectioned listing.
    pub fn task_at(&self, number: usize) -> Option<TaskId> {
        let state = self.store.read().state;
        task_sections(&state.tasks).nth(number).map(|task| task.id.clone())
    }

    pub fn connection(&self) -> ConnectionState {
        self.store.connection()
    }
}
