//! Task list mutations and presentation order.
//!
//! Every mutation returns a new document. Authorization is checked here, not
//! in the presentation layer: system tasks are open to anyone, every other
//! task only to its creator.

use std::cmp::Ordering;

use super::{
    entity::{SharedState, Task},
    error::{TaskError, ValidationError},
    value_object::{ParticipantId, TaskId, TaskText, Timestamp},
};

/// `true` if `actor` may toggle, edit or delete `task`.
pub fn can_modify(task: &Task, actor: &ParticipantId) -> bool {
    task.is_system() || &task.created_by == actor
}

/// Build a new, incomplete task authored by `author`.
pub fn new_task(text: &str, author: ParticipantId, now: Timestamp) -> Result<Task, ValidationError> {
    let text = TaskText::parse(text)?;
    Ok(Task::new(TaskId::generate(), text.into_string(), author, now))
}

pub fn append(state: &SharedState, task: Task) -> SharedState {
    let mut tasks = state.tasks.clone();
    tasks.push(task);
    state.with_tasks(tasks)
}

fn modify<F>(
    state: &SharedState,
    id: &TaskId,
    actor: &ParticipantId,
    change: F,
) -> Result<SharedState, TaskError>
where
    F: FnOnce(&Task) -> Task,
{
    let task = state
        .task(id)
        .ok_or_else(|| TaskError::NotFound(id.as_str().to_string()))?;
    if !can_modify(task, actor) {
        return Err(TaskError::NotAuthorized {
            task_id: id.as_str().to_string(),
            actor: actor.as_str().to_string(),
        });
    }
    let changed = change(task);
    let tasks = state
        .tasks
        .iter()
        .map(|t| if &t.id == id { changed.clone() } else { t.clone() })
        .collect();
    Ok(state.with_tasks(tasks))
}

/// Flip `completed`.
pub fn toggle(state: &SharedState, id: &TaskId, actor: &ParticipantId) -> Result<SharedState, TaskError> {
    modify(state, id, actor, |task| Task {
        completed: !task.completed,
        ..task.clone()
    })
}

/// Replace `text`, keeping `createdAt` and `createdBy`.
pub fn edit_text(
    state: &SharedState,
    id: &TaskId,
    new_text: &str,
    actor: &ParticipantId,
) -> Result<SharedState, TaskError> {
    let text = TaskText::parse(new_text)?;
    modify(state, id, actor, |task| Task {
        text: text.into_string(),
        ..task.clone()
    })
}

pub fn remove(state: &SharedState, id: &TaskId, actor: &ParticipantId) -> Result<SharedState, TaskError> {
    let task = state
        .task(id)
        .ok_or_else(|| TaskError::NotFound(id.as_str().to_string()))?;
    if !can_modify(task, actor) {
        return Err(TaskError::NotAuthorized {
            task_id: id.as_str().to_string(),
            actor: actor.as_str().to_string(),
        });
    }
    let tasks = state.tasks.iter().filter(|t| &t.id != id).cloned().collect();
    Ok(state.with_tasks(tasks))
}

/// Tasks split the way the list is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSections<'a> {
    /// Onboarding tasks ("Getting Started").
    pub system: Vec<&'a Task>,
    /// Everything participants created ("All Tasks").
    pub user: Vec<&'a Task>,
}

impl<'a> TaskSections<'a> {
    /// System section first, then user section.
    pub fn iter(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.system.iter().chain(self.user.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.system.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 1-based position in display order, as used by the terminal commands.
    pub fn nth(&self, number: usize) -> Option<&'a Task> {
        number.checked_sub(1).and_then(|i| self.iter().nth(i))
    }
}

fn display_order(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Incomplete first, then newest first, in two sections.
pub fn task_sections(tasks: &[Task]) -> TaskSections<'_> {
    let (mut system, mut user): (Vec<&Task>, Vec<&Task>) = tasks.iter().partition(|t| t.is_system());
    system.sort_by(|a, b| display_order(a, b));
    user.sort_by(|a, b| display_order(a, b));
    TaskSections { system, user }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn task(id: &str, by: &str, created_at: i64, completed: bool) -> Task {
        Task {
            id: TaskId::new(id),
            text: format!("task {}", id),
            description: None,
            completed,
            created_at: Timestamp::new(created_at),
            created_by: if by == "system" {
                ParticipantId::system()
            } else {
                pid(by)
            },
        }
    }

    #[test]
    fn test_new_task_rejects_whitespace_only_text() {
        // テスト項目: 空白のみのテキストではタスクを作れない
        // given (前提条件):
        let author = pid("user_a");

        // when (操作):
        let result = new_task("   ", author, Timestamp::new(0));

        // then (期待する結果):
        assert_eq!(result, Err(ValidationError::EmptyTaskText));
    }

    #[test]
    fn test_append_adds_exactly_one_incomplete_task() {
        // テスト項目: タスク追加で未完了のタスクが 1 件だけ増える
        // given (前提条件):
        let state = SharedState::seeded(Timestamp::new(0));
        let author = pid("user_a");

        // when (操作):
        let task = new_task("  Buy milk ", author.clone(), Timestamp::new(10)).unwrap();
        let next = append(&state, task);

        // then (期待する結果):
        assert_eq!(next.tasks.len(), state.tasks.len() + 1);
        let added = next.tasks.last().unwrap();
        assert_eq!(added.text, "Buy milk");
        assert!(!added.completed);
        assert_eq!(added.created_by, author);
        assert!(state.task(&added.id).is_none());
    }

    #[test]
    fn test_toggle_twice_restores_original() {
        // テスト項目: 2 回トグルすると元の状態に戻る
        // given (前提条件):
        let state = SharedState::default().with_tasks(vec![task("t1", "user_a", 0, false)]);
        let actor = pid("user_a");
        let id = TaskId::new("t1");

        // when (操作):
        let once = toggle(&state, &id, &actor).unwrap();
        let twice = toggle(&once, &id, &actor).unwrap();

        // then (期待する結果):
        assert!(once.task(&id).unwrap().completed);
        assert_eq!(twice, state);
    }

    #[test]
    fn test_edit_text_keeps_author_and_creation_time() {
        // テスト項目: テキスト編集で createdAt / createdBy は変わらない
        // given (前提条件):
        let state = SharedState::default().with_tasks(vec![task("t1", "user_a", 42, false)]);
        let id = TaskId::new("t1");

        // when (操作):
        let next = edit_text(&state, &id, " Walk dog ", &pid("user_a")).unwrap();

        // then (期待する結果):
        let edited = next.task(&id).unwrap();
        assert_eq!(edited.text, "Walk dog");
        assert_eq!(edited.created_at, Timestamp::new(42));
        assert_eq!(edited.created_by, pid("user_a"));
    }

    #[test]
    fn test_edit_text_rejects_empty_text() {
        // テスト項目: 空テキストへの編集は拒否される
        // given (前提条件):
        let state = SharedState::default().with_tasks(vec![task("t1", "user_a", 0, false)]);

        // when (操作):
        let result = edit_text(&state, &TaskId::new("t1"), "  ", &pid("user_a"));

        // then (期待する結果):
        assert_eq!(result, Err(TaskError::Validation(ValidationError::EmptyTaskText)));
    }

    #[test]
    fn test_foreign_task_cannot_be_modified() {
        // テスト項目: 他人が作成したタスクは変更・削除できない
        // given (前提条件):
        let state = SharedState::default().with_tasks(vec![task("t1", "user_a", 0, false)]);
        let id = TaskId::new("t1");
        let bob = pid("user_b");

        // when (操作):
        let toggled = toggle(&state, &id, &bob);
        let edited = edit_text(&state, &id, "mine now", &bob);
        let removed = remove(&state, &id, &bob);

        // then (期待する結果):
        for result in [toggled, edited, removed] {
            assert!(matches!(result, Err(TaskError::NotAuthorized { .. })));
        }
    }

    #[test]
    fn test_system_task_is_open_to_anyone() {
        // テスト項目: system タスクは誰でも変更・削除できる
        // given (前提条件):
        let state = SharedState::seeded(Timestamp::new(0));
        let id = TaskId::new("welcome-1");
        let bob = pid("user_b");

        // when (操作):
        let toggled = toggle(&state, &id, &bob).unwrap();
        let removed = remove(&toggled, &id, &bob).unwrap();

        // then (期待する結果):
        assert!(toggled.task(&id).unwrap().completed);
        assert!(removed.task(&id).is_none());
        assert_eq!(removed.tasks.len(), 1);
    }

    #[test]
    fn test_unknown_task_is_not_found() {
        // テスト項目: 存在しないタスクは NotFound
        // given (前提条件):
        let state = SharedState::default();

        // when (操作):
        let result = remove(&state, &TaskId::new("nope"), &pid("user_a"));

        // then (期待する結果):
        assert_eq!(result, Err(TaskError::NotFound("nope".to_string())));
    }

    #[test]
    fn test_task_sections_order() {
        // テスト項目: セクションごとに未完了 → 新しい順で並ぶ
        // given (前提条件):
        let tasks = vec![
            task("welcome-1", "system", 0, true),
            task("welcome-2", "system", 0, false),
            task("old", "user_a", 100, false),
            task("done", "user_a", 300, true),
            task("new", "user_b", 200, false),
        ];

        // when (操作):
        let sections = task_sections(&tasks);

        // then (期待する結果):
        let system: Vec<&str> = sections.system.iter().map(|t| t.id.as_str()).collect();
        let user: Vec<&str> = sections.user.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(system, vec!["welcome-2", "welcome-1"]);
        assert_eq!(user, vec!["new", "old", "done"]);
        assert_eq!(sections.len(), 5);
        assert_eq!(sections.nth(3).unwrap().id.as_str(), "new");
        assert!(sections.nth(0).is_none());
        assert!(sections.nth(6).is_none());
    }
}
