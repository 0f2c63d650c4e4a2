//! Presence manager: join, heartbeat and leave for the local participant.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use yoriai_shared::{
    domain::{
        Participant, ParticipantId, Profile, SharedState, Timestamp, ValidationError,
        compute_active_roster, count_fresh_others, is_fresh, is_name_taken,
        limits::{HEARTBEAT_INTERVAL_MS, ROOM_CAPACITY},
    },
    time::Clock,
};

use crate::{
    error::{JoinError, StoreError},
    store::DocumentStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceConfig {
    pub heartbeat_interval: Duration,
    /// Maximum number of fresh participants in a room.
    pub capacity: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS.unsigned_abs()),
            capacity: ROOM_CAPACITY,
        }
    }
}

/// Client-local view of the local participant's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Unjoined,
    Joining,
    Joined,
    /// Joined, but the record has not been refreshed within the freshness window.
    Stale,
    Removed,
}

/// Why a join candidate cannot be inserted into `state`.
fn join_obstacle(
    state: &SharedState,
    id: &ParticipantId,
    name: &str,
    capacity: usize,
    now: Timestamp,
) -> Option<JoinError> {
    if is_name_taken(&state.users, name, now, id) {
        return Some(JoinError::Validation(ValidationError::NameTaken));
    }
    if count_fresh_others(&state.users, now, id) >= capacity {
        return Some(JoinError::RoomFull { capacity });
    }
    None
}

pub struct PresenceManager {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    participant_id: ParticipantId,
    config: PresenceConfig,
}

impl PresenceManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        participant_id: ParticipantId,
        config: PresenceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            participant_id,
            config,
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Insert (or refresh) the local participant's record.
    ///
    /// Fails without touching the document when the name is taken by another
    /// fresh participant or the room already holds `capacity` fresh others.
    /// Both conditions are checked again against the snapshot the store
    /// applies the change to.
    pub async fn join(&self, profile: &Profile) -> Result<Participant, JoinError> {
        let now = self.now();
        let id = self.participant_id.clone();
        let capacity = self.config.capacity;

        if let Some(obstacle) =
            join_obstacle(&self.store.read().state, &id, &profile.name, capacity, now)
        {
            return Err(obstacle);
        }

        let record = profile.to_participant(id.clone(), now);
        let candidate = record.clone();
        self.store
            .submit(Box::new(move |state: &SharedState| {
                match join_obstacle(state, &candidate.id, &candidate.name, capacity, now) {
                    Some(_) => state.clone(),
                    None => state.with_participant(candidate.clone()),
                }
            }))
            .await?;

        let latest = self.store.read().state;
        if latest.participant(&id) == Some(&record) {
            tracing::info!("Joined as '{}' ({})", record.name, id);
            return Ok(record);
        }
        Err(join_obstacle(&latest, &id, &profile.name, capacity, now)
            .unwrap_or(JoinError::RoomFull { capacity }))
    }

    /// Refresh `lastSeen` of the local record.
    ///
    /// Skipped while the store is disconnected (`Ok(false)`). A record that
    /// vanished, e.g. expired by the server, is re-inserted from `profile`.
    pub async fn heartbeat(&self, profile: &Profile) -> Result<bool, StoreError> {
        if !self.store.is_connected() {
            tracing::debug!("Skipping heartbeat while disconnected");
            return Ok(false);
        }

        let now = self.now();
        let id = self.participant_id.clone();
        let profile = profile.clone();
        self.store
            .submit(Box::new(move |state: &SharedState| {
                state
                    .with_heartbeat(&id, now)
                    .unwrap_or_else(|| state.with_participant(profile.to_participant(id.clone(), now)))
            }))
            .await?;
        Ok(true)
    }

    /// Remove the local record and any live edit of ours.
    pub async fn leave(&self) -> Result<(), StoreError> {
        let id = self.participant_id.clone();
        self.store
            .submit(Box::new(move |state: &SharedState| {
                state.without_participant(&id).without_live_edit(&id)
            }))
            .await?;
        tracing::info!("Left the room");
        Ok(())
    }

    /// Fresh participants, de-duplicated by name.
    pub fn roster(&self) -> Vec<Participant> {
        compute_active_roster(&self.store.read().state.users, self.now())
    }

    /// `Joined` or `Stale` depending on the freshness of the local record.
    pub fn joined_status(&self) -> PresenceStatus {
        let state = self.store.read().state;
        match state.participant(&self.participant_id) {
            Some(record) if is_fresh(record, self.now()) => PresenceStatus::Joined,
            _ => PresenceStatus::Stale,
        }
    }

    /// Start the periodic heartbeat for `profile`.
    pub fn spawn_heartbeat(self: &Arc<Self>, profile: Profile) -> HeartbeatTask {
        let manager = self.clone();
        let period = self.config.heartbeat_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; join has just written the record
            interval.tick().await;
            loop {
                interval.tick().await;
                match manager.heartbeat(&profile).await {
                    Ok(true) => tracing::debug!("Heartbeat sent"),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Heartbeat failed: {}", e),
                }
            }
        });
        HeartbeatTask { handle }
    }
}

/// Owned heartbeat ticker. Stops when dropped.
pub struct HeartbeatTask {
    handle: JoinHandle<()>,
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Roster split for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceView {
    pub me: Option<Participant>,
    pub others: Vec<Participant>,
    pub total: usize,
}

/// Split `roster` into the local participant and everybody else.
///
/// Falls back to `local_profile` for `me` when the local record is not in the roster.
pub fn presence_view(
    roster: &[Participant],
    local_id: &ParticipantId,
    local_profile: Option<&Profile>,
) -> PresenceView {
    let me = roster
        .iter()
        .find(|p| &p.id == local_id)
        .cloned()
        .or_else(|| {
            local_profile.map(|profile| Participant {
                last_seen: None,
                ..profile.to_participant(local_id.clone(), Timestamp::new(0))
            })
        });
    let others: Vec<Participant> = roster
        .iter()
        .filter(|p| &p.id != local_id)
        .cloned()
        .collect();
    let total = usize::from(me.is_some()) + others.len();
    PresenceView { me, others, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConnectionState, InMemoryDocumentStore, MockDocumentStore, Snapshot};
    use yoriai_shared::time::ManualClock;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn manager(
        store: Arc<InMemoryDocumentStore>,
        clock: &ManualClock,
        id: &str,
    ) -> Arc<PresenceManager> {
        Arc::new(PresenceManager::new(
            store,
            Arc::new(clock.clone()),
            pid(id),
            PresenceConfig::default(),
        ))
    }

    fn profile(name: &str) -> Profile {
        Profile::with_color(name, "#3b82f6").unwrap()
    }

    #[tokio::test]
    async fn test_join_inserts_active_record() {
        // テスト項目: 有効な名前で参加すると isActive=true のレコードが 1 件だけ入る
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(1_000);
        let alice = manager(store.clone(), &clock, "user_a");

        // when (操作):
        let record = alice.join(&profile("Alice")).await.unwrap();

        // then (期待する結果):
        let users = store.read().state.users;
        assert_eq!(users.len(), 1);
        assert_eq!(users.get(&pid("user_a")), Some(&record));
        assert!(record.is_active);
        assert_eq!(record.last_seen, Some(Timestamp::new(1_000)));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected_case_insensitively() {
        // テスト項目: 大文字小文字を無視して同名の参加者がいると NameTaken で失敗し、文書は変わらない
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(1_000);
        manager(store.clone(), &clock, "user_a")
            .join(&profile("Alice"))
            .await
            .unwrap();
        let before = store.read();

        // when (操作):
        let result = manager(store.clone(), &clock, "user_b")
            .join(&profile("  ALICE "))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(JoinError::Validation(ValidationError::NameTaken))
        );
        assert_eq!(store.read(), before);
    }

    #[tokio::test]
    async fn test_rejoin_with_same_id_and_name_succeeds() {
        // テスト項目: 同じ ID・同じ名前での再参加は自分自身と衝突しない
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(1_000);
        let alice = manager(store.clone(), &clock, "user_a");
        alice.join(&profile("Alice")).await.unwrap();

        // when (操作):
        clock.advance(5_000);
        let result = alice.join(&profile("Alice")).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(store.read().state.users.len(), 1);
        assert_eq!(
            store.read().state.users[&pid("user_a")].last_seen,
            Some(Timestamp::new(6_000))
        );
    }

    #[tokio::test]
    async fn test_full_room_fails_loudly() {
        // テスト項目: 新鮮な参加者が 10 人いると RoomFull で失敗し、人数は増えない
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(1_000);
        for i in 0..10 {
            manager(store.clone(), &clock, &format!("user_{}", i))
                .join(&profile(&format!("Member {}", i)))
                .await
                .unwrap();
        }

        // when (操作):
        let result = manager(store.clone(), &clock, "user_x")
            .join(&profile("Latecomer"))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(JoinError::RoomFull { capacity: 10 }));
        assert_eq!(store.read().state.users.len(), 10);
    }

    #[tokio::test]
    async fn test_stale_participants_do_not_count_towards_capacity() {
        // テスト項目: 古くなった参加者は定員にも名前の重複にも数えない
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(0);
        for i in 0..10 {
            manager(store.clone(), &clock, &format!("user_{}", i))
                .join(&profile(&format!("Member {}", i)))
                .await
                .unwrap();
        }

        // when (操作):
        clock.advance(30_000);
        let result = manager(store.clone(), &clock, "user_x")
            .join(&profile("Member 0"))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_leave_removes_record_and_live_edit() {
        // テスト項目: 退室で自分のレコードとライブ編集が消える
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(0);
        let alice = manager(store.clone(), &clock, "user_a");
        alice.join(&profile("Alice")).await.unwrap();

        // when (操作):
        alice.leave().await.unwrap();

        // then (期待する結果):
        let state = store.read().state;
        assert!(state.users.is_empty());
        assert!(state.live.edits.is_empty());
        assert!(alice.roster().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_refreshes_last_seen() {
        // テスト項目: ハートビートが 10 秒ごとに lastSeen を更新し、状態は Joined のまま
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(0);
        let alice = manager(store.clone(), &clock, "user_a");
        alice.join(&profile("Alice")).await.unwrap();
        let task = alice.spawn_heartbeat(profile("Alice"));

        // when (操作):
        clock.advance(25_000);
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        // then (期待する結果):
        assert_eq!(
            store.read().state.users[&pid("user_a")].last_seen,
            Some(Timestamp::new(25_000))
        );
        clock.advance(10_000);
        assert_eq!(alice.joined_status(), PresenceStatus::Joined);
        drop(task);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_is_skipped_while_disconnected() {
        // テスト項目: 切断中のティックは書き込まず、再接続後の最初のティックで最新時刻を書く
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(0);
        let alice = manager(store.clone(), &clock, "user_a");
        alice.join(&profile("Alice")).await.unwrap();
        let _task = alice.spawn_heartbeat(profile("Alice"));

        // when (操作):
        store.set_connected(false);
        clock.advance(10_000);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let during_outage = store.read().state.users[&pid("user_a")].last_seen;

        store.set_connected(true);
        clock.advance(10_000);
        tokio::time::sleep(Duration::from_millis(10_000)).await;

        // then (期待する結果):
        assert_eq!(during_outage, Some(Timestamp::new(0)));
        assert_eq!(
            store.read().state.users[&pid("user_a")].last_seen,
            Some(Timestamp::new(20_000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_heartbeat_task_stops_ticks() {
        // テスト項目: HeartbeatTask を破棄するとハートビートが止まる
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(0);
        let alice = manager(store.clone(), &clock, "user_a");
        alice.join(&profile("Alice")).await.unwrap();
        let task = alice.spawn_heartbeat(profile("Alice"));

        // when (操作):
        drop(task);
        clock.advance(10_000);
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        // then (期待する結果):
        assert_eq!(
            store.read().state.users[&pid("user_a")].last_seen,
            Some(Timestamp::new(0))
        );
    }

    #[tokio::test]
    async fn test_heartbeat_reinserts_swept_record() {
        // テスト項目: サーバーに掃除されたレコードはハートビートで戻る
        // given (前提条件):
        let store = Arc::new(InMemoryDocumentStore::default());
        let clock = ManualClock::new(0);
        let alice = manager(store.clone(), &clock, "user_a");

        // when (操作):
        clock.advance(70_000);
        let sent = alice.heartbeat(&profile("Alice")).await.unwrap();

        // then (期待する結果):
        assert!(sent);
        let record = store.read().state.users[&pid("user_a")].clone();
        assert_eq!(record.name, "Alice");
        assert_eq!(record.last_seen, Some(Timestamp::new(70_000)));
    }

    #[tokio::test]
    async fn test_heartbeat_does_not_submit_when_disconnected() {
        // テスト項目: 切断中は submit を呼ばない
        // given (前提条件):
        let mut store = MockDocumentStore::new();
        store.expect_is_connected().return_const(false);
        store.expect_connection().return_const(ConnectionState::Disconnected);
        store.expect_submit().never();
        store.expect_read().returning(Snapshot::default);
        let alice = PresenceManager::new(
            Arc::new(store),
            Arc::new(ManualClock::new(0)),
            pid("user_a"),
            PresenceConfig::default(),
        );

        // when (操作):
        let sent = alice.heartbeat(&profile("Alice")).await;

        // then (期待する結果):
        assert_eq!(sent, Ok(false));
    }

    #[test]
    fn test_presence_view_falls_back_to_profile() {
        // テスト項目: 自分のレコードが名簿に無いときはプロフィールで me を補う
        // given (前提条件):
        let bob = profile("Bob").to_participant(pid("user_b"), Timestamp::new(0));
        let roster = vec![bob.clone()];

        // when (操作):
        let view = presence_view(&roster, &pid("user_a"), Some(&profile("Alice")));

        // then (期待する結果):
        assert_eq!(view.me.as_ref().map(|p| p.name.as_str()), Some("Alice"));
        assert_eq!(view.others, vec![bob]);
        assert_eq!(view.total, 2);

        let alone = presence_view(&[], &pid("user_a"), None);
        assert_eq!(alone.total, 0);
    }
}
