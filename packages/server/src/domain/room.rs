//! Room aggregate: the versioned document plus its live subscribers.

use std::collections::BTreeSet;

use serde::Serialize;
use yoriai_shared::domain::{ParticipantId, RoomId, SharedState, Timestamp, check_transition};

use super::error::{RepositoryError, SubmissionError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    pub id: RoomId,
    /// Incremented by one for every stored change.
    pub version: u64,
    pub state: SharedState,
    pub created_at: Timestamp,
    /// Participant ids with an open WebSocket on this room.
    pub subscribers: BTreeSet<ParticipantId>,
}

impl RoomDocument {
    /// A new room at version 0, optionally seeded with the onboarding tasks.
    pub fn new(id: RoomId, created_at: Timestamp, seed: bool) -> Self {
        let state = if seed {
            SharedState::seeded(created_at)
        } else {
            SharedState::default()
        };
        Self {
            id,
            version: 0,
            state,
            created_at,
            subscribers: BTreeSet::new(),
        }
    }

    pub fn add_subscriber(&mut self, client_id: ParticipantId) -> Result<(), RepositoryError> {
        if self.subscribers.contains(&client_id) {
            return Err(RepositoryError::DuplicateSubscriber(
                client_id.into_string(),
            ));
        }
        self.subscribers.insert(client_id);
        Ok(())
    }

    /// Returns `false` if `client_id` was not subscribed.
    pub fn remove_subscriber(&mut self, client_id: &ParticipantId) -> bool {
        self.subscribers.remove(client_id)
    }

    /// Store `document` as the successor of `base_version` on behalf of `actor`.
    ///
    /// Returns the new version. A document equal to the current one is
    /// accepted without a version bump.
    pub fn apply_submission(
        &mut self,
        actor: &ParticipantId,
        base_version: u64,
        document: SharedState,
    ) -> Result<u64, SubmissionError> {
        if base_version != self.version {
            return Err(SubmissionError::Conflict {
                base: base_version,
                current: self.version,
            });
        }
        check_transition(&self.state, &document, actor)?;
        if document != self.state {
            self.state = document;
            self.version += 1;
        }
        Ok(self.version)
    }

    /// Drop expired presence records and live edits. Returns `true` if anything changed.
    pub fn sweep(&mut self, now: Timestamp, expiry_ms: i64) -> bool {
        match self.state.swept(now, expiry_ms) {
            Some(next) => {
                self.state = next;
                self.version += 1;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yoriai_shared::domain::{Participant, PolicyViolation, TaskId, tasks};

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn create_test_room() -> RoomDocument {
        RoomDocument::new(
            RoomId::new("room1".to_string()).unwrap(),
            Timestamp::new(0),
            true,
        )
    }

    fn alice_record(last_seen: i64) -> Participant {
        Participant {
            id: pid("user_a"),
            name: "Alice".to_string(),
            color: "#fff".to_string(),
            initials: "A".to_string(),
            is_active: true,
            last_seen: Some(Timestamp::new(last_seen)),
        }
    }

    #[test]
    fn test_new_room_is_seeded_at_version_zero() {
        // テスト項目: 新規ルームはバージョン 0 でオンボーディングタスクを持つ
        // given (前提条件) / when (操作):
        let room = create_test_room();

        // then (期待する結果):
        assert_eq!(room.version, 0);
        assert_eq!(room.state.tasks.len(), 2);

        let empty = RoomDocument::new(room.id.clone(), Timestamp::new(0), false);
        assert!(empty.state.tasks.is_empty());
    }

    #[test]
    fn test_duplicate_subscriber_is_rejected() {
        // テスト項目: 同じ参加者 ID の二重購読は拒否される
        // given (前提条件):
        let mut room = create_test_room();
        room.add_subscriber(pid("user_a")).unwrap();

        // when (操作):
        let result = room.add_subscriber(pid("user_a"));

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::DuplicateSubscriber("user_a".to_string()))
        );
        assert_eq!(room.subscribers.len(), 1);
    }

    #[test]
    fn test_submission_bumps_version() {
        // テスト項目: 現在のバージョンに基づく提出は受理されバージョンが 1 増える
        // given (前提条件):
        let mut room = create_test_room();
        let next = room.state.with_participant(alice_record(10));

        // when (操作):
        let version = room.apply_submission(&pid("user_a"), 0, next.clone());

        // then (期待する結果):
        assert_eq!(version, Ok(1));
        assert_eq!(room.state, next);
    }

    #[test]
    fn test_stale_submission_is_a_conflict() {
        // テスト項目: 古いバージョンに基づく提出は Conflict になり、状態は変わらない
        // given (前提条件):
        let mut room = create_test_room();
        room.apply_submission(&pid("user_a"), 0, room.state.with_participant(alice_record(10)))
            .unwrap();
        let before = room.state.clone();

        // when (操作):
        let stale = SharedState::seeded(Timestamp::new(0));
        let result = room.apply_submission(&pid("user_b"), 0, stale);

        // then (期待する結果):
        assert_eq!(result, Err(SubmissionError::Conflict { base: 0, current: 1 }));
        assert_eq!(room.state, before);
        assert_eq!(room.version, 1);
    }

    #[test]
    fn test_policy_violation_is_refused() {
        // テスト項目: ポリシー違反の提出は拒否される
        // given (前提条件):
        let mut room = create_test_room();
        let task = tasks::new_task("Buy milk", pid("user_a"), Timestamp::new(1)).unwrap();
        let task_id: TaskId = task.id.clone();
        room.apply_submission(&pid("user_a"), 0, tasks::append(&room.state, task))
            .unwrap();

        // when (操作): bob が alice のタスクを削除しようとする
        let mut tampered = room.state.clone();
        tampered.tasks.retain(|t| t.id != task_id);
        let result = room.apply_submission(&pid("user_b"), 1, tampered);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(SubmissionError::Policy(PolicyViolation::ForeignTaskRemoved { .. }))
        ));
        assert!(room.state.task(&task_id).is_some());
    }

    #[test]
    fn test_identical_submission_keeps_version() {
        // テスト項目: 内容が同じ提出はバージョンを上げない
        // given (前提条件):
        let mut room = create_test_room();
        let same = room.state.clone();

        // when (操作):
        let version = room.apply_submission(&pid("user_a"), 0, same);

        // then (期待する結果):
        assert_eq!(version, Ok(0));
    }

    #[test]
    fn test_sweep_removes_expired_presence() {
        // テスト項目: スイープで期限切れのプレゼンスが削除されバージョンが上がる
        // given (前提条件):
        let mut room = create_test_room();
        room.apply_submission(&pid("user_a"), 0, room.state.with_participant(alice_record(0)))
            .unwrap();

        // when (操作):
        let fresh = room.sweep(Timestamp::new(59_999), 60_000);
        let expired = room.sweep(Timestamp::new(60_000), 60_000);

        // then (期待する結果):
        assert!(!fresh);
        assert!(expired);
        assert!(room.state.users.is_empty());
        assert_eq!(room.version, 2);
    }
}
