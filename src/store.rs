//! The task reducer: every change to the collection, the selection set and the
//! selection mode goes through [`StoreState::reduce`].

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::models::{Task, TaskDraft, TaskId, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Normal,
    SelectionActive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingTitle,
    MissingDate,
    MissingTime,
    /// Every id up to `u64::MAX` is taken.
    IdsExhausted,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingTitle => write!(f, "Please enter a title for your todo!"),
            ValidationError::MissingDate => write!(f, "Please select a date!"),
            ValidationError::MissingTime => write!(f, "Please select a time!"),
            ValidationError::IdsExhausted => write!(f, "No more todo ids are available."),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTask(TaskDraft),
    UpdateTask(TaskId, TaskPatch),
    DeleteTask(TaskId),
    DeleteChecked,
    ToggleCompleted(TaskId),
    SetCompleted(TaskId, bool),
    EnterSelectionMode,
    ExitSelectionMode,
    ToggleChecked(TaskId),
    ReplaceAll(Vec<Task>),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(TaskId),
    Updated(TaskId),
    Removed(Vec<TaskId>),
    Completed { id: TaskId, completed: bool },
    ModeChanged(Mode),
    Checked { id: TaskId, checked: bool },
    Replaced(usize),
    Reset,
    NotFound(TaskId),
    /// The command is not valid in the current mode.
    Ignored,
    Unchanged,
}

impl Outcome {
    /// Whether the task collection itself changed, i.e. whether it needs to be written out.
    pub fn changes_tasks(&self) -> bool {
        match self {
            Outcome::Added(_)
            | Outcome::Updated(_)
            | Outcome::Removed(_)
            | Outcome::Completed { .. } => true,
            Outcome::ModeChanged(_)
            | Outcome::Checked { .. }
            | Outcome::Replaced(_)
            | Outcome::Reset
            | Outcome::NotFound(_)
            | Outcome::Ignored
            | Outcome::Unchanged => false,
        }
    }

    /// Whether anything observable (tasks, selection or mode) changed.
    pub fn changes_state(&self) -> bool {
        !matches!(
            self,
            Outcome::NotFound(_) | Outcome::Ignored | Outcome::Unchanged
        )
    }
}

/// Hands out task ids. Only ever moves forward, so ids are never reused in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IdAllocator {
    /// `None` once `u64::MAX` has been handed out or seen.
    next: Option<u64>,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next: Some(1) }
    }

    fn observe(&mut self, tasks: &[Task]) {
        if let Some(max) = tasks.iter().map(|task| task.id.0).max() {
            self.next = match (self.next, max.checked_add(1)) {
                (Some(next), Some(after)) => Some(next.max(after)),
                _ => None,
            };
        }
    }

    fn allocate(&mut self) -> Option<TaskId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(TaskId(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    tasks: Vec<Task>,
    selection: BTreeSet<TaskId>,
    mode: Mode,
    ids: IdAllocator,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StoreState {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut ids = IdAllocator::new();
        ids.observe(&tasks);
        Self {
            tasks,
            selection: BTreeSet::new(),
            mode: Mode::Normal,
            ids,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn selection(&self) -> &BTreeSet<TaskId> {
        &self.selection
    }

    pub fn is_checked(&self, id: TaskId) -> bool {
        self.selection.contains(&id)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Applies one command and returns the next state. `self` is left untouched, and
    /// on a validation error no state is produced at all.
    pub fn reduce(&self, command: Command) -> Result<(StoreState, Outcome), ValidationError> {
        let mut next = self.clone();
        let outcome = next.apply(command)?;
        Ok((next, outcome))
    }

    fn apply(&mut self, command: Command) -> Result<Outcome, ValidationError> {
        let outcome = match command {
            Command::AddTask(draft) => self.add_task(draft)?,
            Command::UpdateTask(id, patch) => self.update_task(id, patch)?,
            Command::DeleteTask(id) => self.delete_task(id),
            Command::DeleteChecked => self.delete_checked(),
            Command::ToggleCompleted(id) => match self.position(id) {
                Some(index) => {
                    let task = &mut self.tasks[index];
                    task.completed = !task.completed;
                    Outcome::Completed {
                        id,
                        completed: task.completed,
                    }
                }
                None => Outcome::NotFound(id),
            },
            Command::SetCompleted(id, completed) => match self.position(id) {
                Some(index) if self.tasks[index].completed == completed => Outcome::Unchanged,
                Some(index) => {
                    self.tasks[index].completed = completed;
                    Outcome::Completed { id, completed }
                }
                None => Outcome::NotFound(id),
            },
            Command::EnterSelectionMode => {
                if self.mode == Mode::SelectionActive {
                    Outcome::Unchanged
                } else {
                    self.mode = Mode::SelectionActive;
                    Outcome::ModeChanged(Mode::SelectionActive)
                }
            }
            Command::ExitSelectionMode => {
                let was_active = self.mode == Mode::SelectionActive;
                self.selection.clear();
                self.mode = Mode::Normal;
                if was_active {
                    Outcome::ModeChanged(Mode::Normal)
                } else {
                    Outcome::Unchanged
                }
            }
            Command::ToggleChecked(id) => self.toggle_checked(id),
            Command::ReplaceAll(tasks) => {
                self.ids.observe(&tasks);
                self.tasks = tasks;
                self.selection.clear();
                self.mode = Mode::Normal;
                Outcome::Replaced(self.tasks.len())
            }
            Command::Reset => {
                self.tasks.clear();
                self.selection.clear();
                self.mode = Mode::Normal;
                Outcome::Reset
            }
        };
        if let Outcome::NotFound(id) = &outcome {
            log::debug!("command referenced unknown task id={id}; no-op");
        }
        Ok(outcome)
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn add_task(&mut self, draft: TaskDraft) -> Result<Outcome, ValidationError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let date = draft.date.ok_or(ValidationError::MissingDate)?;
        let time = draft.time.ok_or(ValidationError::MissingTime)?;
        let id = self.ids.allocate().ok_or(ValidationError::IdsExhausted)?;
        self.tasks.push(Task {
            id,
            title: title.to_string(),
            date: Some(date),
            time: Some(time),
            completed: false,
        });
        Ok(Outcome::Added(id))
    }

    fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Outcome, ValidationError> {
        let title = match patch.title {
            Some(title) => {
                let title = title.trim();
                if title.is_empty() {
                    return Err(ValidationError::MissingTitle);
                }
                Some(title.to_string())
            }
            None => None,
        };
        let Some(index) = self.position(id) else {
            return Ok(Outcome::NotFound(id));
        };
        let task = &mut self.tasks[index];
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(date) = patch.date {
            task.date = Some(date);
        }
        if let Some(time) = patch.time {
            task.time = Some(time);
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        Ok(Outcome::Updated(id))
    }

    fn delete_task(&mut self, id: TaskId) -> Outcome {
        match self.position(id) {
            Some(index) => {
                self.tasks.remove(index);
                self.selection.remove(&id);
                Outcome::Removed(vec![id])
            }
            None => Outcome::NotFound(id),
        }
    }

    fn delete_checked(&mut self) -> Outcome {
        if self.selection.is_empty() {
            return Outcome::Unchanged;
        }
        let removed: Vec<TaskId> = self
            .tasks
            .iter()
            .map(|task| task.id)
            .filter(|id| self.selection.contains(id))
            .collect();
        self.tasks.retain(|task| !self.selection.contains(&task.id));
        self.selection.clear();
        self.mode = Mode::Normal;
        Outcome::Removed(removed)
    }

    fn toggle_checked(&mut self, id: TaskId) -> Outcome {
        if self.mode != Mode::SelectionActive {
            log::debug!("toggle_checked id={id} ignored outside selection mode");
            return Outcome::Ignored;
        }
        if self.position(id).is_none() {
            return Outcome::NotFound(id);
        }
        let checked = if self.selection.remove(&id) {
            false
        } else {
            self.selection.insert(id);
            true
        };
        Outcome::Checked { id, checked }
    }
}

/// In-memory holder for [`StoreState`] that swaps in each reduced state.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    state: StoreState,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            state: StoreState::new(tasks),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, ValidationError> {
        let (next, outcome) = self.state.reduce(command)?;
        self.state = next;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::{CalendarDate, ClockTime};

    fn make_task(id: u64, date: &str) -> Task {
        Task {
            id: TaskId(id),
            title: format!("task-{id}"),
            date: date.parse().ok(),
            time: ClockTime::from_hm(9, 0),
            completed: false,
        }
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft::from_input(title, "2024-05-01", "09:00")
    }

    fn ids(state: &StoreState) -> Vec<u64> {
        state.tasks().iter().map(|task| task.id.0).collect()
    }

    #[test]
    fn add_task_on_empty_store_creates_incomplete_task() {
        let mut store = TaskStore::default();
        let outcome = store
            .dispatch(Command::AddTask(TaskDraft::from_input(
                "Buy milk",
                "2024-05-01",
                "09:00",
            )))
            .expect("valid draft");
        let tasks = store.state().tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(outcome, Outcome::Added(tasks[0].id));
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].date, CalendarDate::from_ymd(2024, 5, 1));
        assert_eq!(tasks[0].time, ClockTime::from_hm(9, 0));
        assert!(!tasks[0].completed);
    }

    #[test]
    fn add_task_rejects_missing_fields_and_leaves_store_unchanged() {
        let store = TaskStore::new(vec![make_task(1, "2024-05-01")]);
        let before = store.state().clone();

        let cases = [
            (TaskDraft::from_input("", "2024-05-01", "09:00"), ValidationError::MissingTitle),
            (TaskDraft::from_input("   ", "2024-05-01", "09:00"), ValidationError::MissingTitle),
            (TaskDraft::from_input("x", "", "09:00"), ValidationError::MissingDate),
            (TaskDraft::from_input("x", "garbage", "09:00"), ValidationError::MissingDate),
            (TaskDraft::from_input("x", "2024-05-01", ""), ValidationError::MissingTime),
        ];
        for (draft, expected) in cases {
            let err = before
                .reduce(Command::AddTask(draft))
                .expect_err("draft must be rejected");
            assert_eq!(err, expected);
        }
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn add_task_accepts_a_typed_draft() {
        let date = CalendarDate::from_ymd(2024, 6, 3).unwrap();
        let time = ClockTime::from_hm(18, 45).unwrap();
        let mut store = TaskStore::default();
        store
            .dispatch(Command::AddTask(TaskDraft::new("Gym", date, time)))
            .unwrap();
        let task = &store.state().tasks()[0];
        assert_eq!((task.date, task.time), (Some(date), Some(time)));
    }

    #[test]
    fn add_task_trims_title() {
        let mut store = TaskStore::default();
        store.dispatch(Command::AddTask(draft("  Walk dog  "))).unwrap();
        assert_eq!(store.state().tasks()[0].title, "Walk dog");
    }

    #[test]
    fn new_ids_never_collide_with_present_or_deleted_ids() {
        let mut store = TaskStore::new(vec![make_task(5, "2024-05-01"), make_task(2, "")]);
        let Outcome::Added(first) = store.dispatch(Command::AddTask(draft("a"))).unwrap() else {
            panic!("expected Added");
        };
        assert_eq!(first, TaskId(6));

        store.dispatch(Command::DeleteTask(first)).unwrap();
        let Outcome::Added(second) = store.dispatch(Command::AddTask(draft("b"))).unwrap() else {
            panic!("expected Added");
        };
        assert_ne!(second, first);
        assert!(second > first);

        let mut seen = BTreeSet::new();
        for task in store.state().tasks() {
            assert!(seen.insert(task.id), "duplicate id {}", task.id);
        }
    }

    #[test]
    fn add_task_after_the_largest_id_is_rejected_without_panicking() {
        let mut store = TaskStore::new(vec![make_task(u64::MAX - 1, "2024-05-01")]);
        assert_eq!(
            store.dispatch(Command::AddTask(draft("last"))).unwrap(),
            Outcome::Added(TaskId(u64::MAX))
        );
        let before = store.state().clone();
        let err = store.dispatch(Command::AddTask(draft("one too many"))).unwrap_err();
        assert_eq!(err, ValidationError::IdsExhausted);
        assert_eq!(store.state(), &before);

        let mut loaded = TaskStore::new(vec![make_task(u64::MAX, "2024-05-01")]);
        assert_eq!(
            loaded.dispatch(Command::AddTask(draft("x"))),
            Err(ValidationError::IdsExhausted)
        );
        assert_eq!(loaded.state().tasks().len(), 1);
    }

    #[test]
    fn reset_does_not_rewind_id_counter() {
        let mut store = TaskStore::default();
        store.dispatch(Command::AddTask(draft("a"))).unwrap();
        store.dispatch(Command::AddTask(draft("b"))).unwrap();
        assert_eq!(store.dispatch(Command::Reset).unwrap(), Outcome::Reset);
        assert!(store.state().tasks().is_empty());
        assert_eq!(
            store.dispatch(Command::AddTask(draft("c"))).unwrap(),
            Outcome::Added(TaskId(3))
        );
    }

    #[test]
    fn update_title_leaves_other_fields_untouched() {
        let mut original = make_task(1, "2024-05-01");
        original.completed = true;
        let mut store = TaskStore::new(vec![original.clone(), make_task(2, "2024-05-02")]);

        let outcome = store
            .dispatch(Command::UpdateTask(TaskId(1), TaskPatch::title("X")))
            .unwrap();
        assert_eq!(outcome, Outcome::Updated(TaskId(1)));

        let updated = store.state().task(TaskId(1)).unwrap();
        assert_eq!(updated.title, "X");
        assert_eq!(updated.date, original.date);
        assert_eq!(updated.time, original.time);
        assert_eq!(updated.completed, original.completed);
        assert_eq!(ids(store.state()), vec![1, 2]);
    }

    #[test]
    fn update_merges_present_fields_in_place() {
        let mut store = TaskStore::new(vec![
            make_task(1, "2024-05-01"),
            make_task(2, "2024-05-01"),
            make_task(3, "2024-05-01"),
        ]);
        let patch = TaskPatch {
            date: CalendarDate::from_ymd(2024, 6, 1),
            time: ClockTime::from_hm(18, 30),
            completed: Some(true),
            ..TaskPatch::default()
        };
        store.dispatch(Command::UpdateTask(TaskId(2), patch)).unwrap();
        let task = store.state().task(TaskId(2)).unwrap();
        assert_eq!(task.title, "task-2");
        assert_eq!(task.date.unwrap().to_string(), "2024-06-01");
        assert_eq!(task.time.unwrap().to_string(), "18:30");
        assert!(task.completed);
        assert_eq!(ids(store.state()), vec![1, 2, 3]);
    }

    #[test]
    fn update_unknown_id_reports_not_found_and_empty_title_is_rejected() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01")]);
        let before = store.state().clone();
        assert_eq!(
            store
                .dispatch(Command::UpdateTask(TaskId(99), TaskPatch::title("X")))
                .unwrap(),
            Outcome::NotFound(TaskId(99))
        );
        assert_eq!(store.state(), &before);

        let err = store
            .dispatch(Command::UpdateTask(TaskId(1), TaskPatch::title(" ")))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingTitle);
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn delete_task_removes_exactly_one() {
        let mut store = TaskStore::new(vec![
            make_task(1, "2024-05-01"),
            make_task(2, "2024-05-01"),
            make_task(3, "2024-05-01"),
        ]);
        assert_eq!(
            store.dispatch(Command::DeleteTask(TaskId(2))).unwrap(),
            Outcome::Removed(vec![TaskId(2)])
        );
        assert_eq!(ids(store.state()), vec![1, 3]);
        assert_eq!(
            store.dispatch(Command::DeleteTask(TaskId(2))).unwrap(),
            Outcome::NotFound(TaskId(2))
        );
        assert_eq!(ids(store.state()), vec![1, 3]);
    }

    #[test]
    fn delete_checked_removes_selection_and_returns_to_normal() {
        let mut store = TaskStore::new(vec![
            make_task(1, "2024-05-01"),
            make_task(2, "2024-05-02"),
            make_task(3, "2024-05-03"),
            make_task(4, "2024-05-04"),
        ]);
        store.dispatch(Command::EnterSelectionMode).unwrap();
        store.dispatch(Command::ToggleChecked(TaskId(1))).unwrap();
        store.dispatch(Command::ToggleChecked(TaskId(3))).unwrap();
        store.dispatch(Command::ToggleChecked(TaskId(2))).unwrap();
        store.dispatch(Command::ToggleChecked(TaskId(3))).unwrap();
        assert_eq!(
            store.state().selection().iter().copied().collect::<Vec<_>>(),
            vec![TaskId(1), TaskId(2)]
        );

        let outcome = store.dispatch(Command::DeleteChecked).unwrap();
        assert_eq!(outcome, Outcome::Removed(vec![TaskId(1), TaskId(2)]));
        assert_eq!(ids(store.state()), vec![3, 4]);
        assert!(store.state().selection().is_empty());
        assert_eq!(store.state().mode(), Mode::Normal);
    }

    #[test]
    fn delete_checked_with_empty_selection_is_a_no_op() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01")]);
        store.dispatch(Command::EnterSelectionMode).unwrap();
        let before = store.state().clone();
        assert_eq!(
            store.dispatch(Command::DeleteChecked).unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(store.state(), &before);
        assert_eq!(store.state().mode(), Mode::SelectionActive);
    }

    #[test]
    fn toggle_completed_flips_one_task_and_twice_restores() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01"), make_task(2, "2024-05-01")]);
        let before = store.state().clone();

        assert_eq!(
            store.dispatch(Command::ToggleCompleted(TaskId(1))).unwrap(),
            Outcome::Completed {
                id: TaskId(1),
                completed: true
            }
        );
        assert!(store.state().task(TaskId(1)).unwrap().completed);
        assert!(!store.state().task(TaskId(2)).unwrap().completed);

        store.dispatch(Command::ToggleCompleted(TaskId(1))).unwrap();
        assert_eq!(store.state(), &before);

        assert_eq!(
            store.dispatch(Command::ToggleCompleted(TaskId(9))).unwrap(),
            Outcome::NotFound(TaskId(9))
        );
    }

    #[test]
    fn set_completed_is_idempotent() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01")]);
        assert!(store
            .dispatch(Command::SetCompleted(TaskId(1), true))
            .unwrap()
            .changes_tasks());
        assert_eq!(
            store.dispatch(Command::SetCompleted(TaskId(1), true)).unwrap(),
            Outcome::Unchanged
        );
        assert!(store.state().task(TaskId(1)).unwrap().completed);
    }

    #[test]
    fn toggle_checked_only_applies_in_selection_mode() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01")]);
        assert_eq!(
            store.dispatch(Command::ToggleChecked(TaskId(1))).unwrap(),
            Outcome::Ignored
        );
        assert!(store.state().selection().is_empty());

        store.dispatch(Command::EnterSelectionMode).unwrap();
        assert_eq!(
            store.dispatch(Command::ToggleChecked(TaskId(42))).unwrap(),
            Outcome::NotFound(TaskId(42))
        );
        assert_eq!(
            store.dispatch(Command::ToggleChecked(TaskId(1))).unwrap(),
            Outcome::Checked {
                id: TaskId(1),
                checked: true
            }
        );
        assert!(store.state().is_checked(TaskId(1)));
    }

    #[test]
    fn exit_selection_mode_always_clears_selection() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01")]);
        store.dispatch(Command::EnterSelectionMode).unwrap();
        assert_eq!(
            store.dispatch(Command::EnterSelectionMode).unwrap(),
            Outcome::Unchanged
        );
        store.dispatch(Command::ToggleChecked(TaskId(1))).unwrap();
        assert_eq!(
            store.dispatch(Command::ExitSelectionMode).unwrap(),
            Outcome::ModeChanged(Mode::Normal)
        );
        assert!(store.state().selection().is_empty());
        assert_eq!(store.state().mode(), Mode::Normal);
        assert_eq!(ids(store.state()), vec![1]);
    }

    #[test]
    fn deleting_a_checked_task_drops_it_from_selection() {
        let mut store = TaskStore::new(vec![make_task(1, "2024-05-01"), make_task(2, "2024-05-01")]);
        store.dispatch(Command::EnterSelectionMode).unwrap();
        store.dispatch(Command::ToggleChecked(TaskId(1))).unwrap();
        store.dispatch(Command::DeleteTask(TaskId(1))).unwrap();
        assert!(store.state().selection().is_empty());
    }

    #[test]
    fn replace_all_installs_tasks_and_advances_id_counter() {
        let mut store = TaskStore::default();
        store.dispatch(Command::EnterSelectionMode).unwrap();
        let outcome = store
            .dispatch(Command::ReplaceAll(vec![make_task(10, "2024-05-01")]))
            .unwrap();
        assert_eq!(outcome, Outcome::Replaced(1));
        assert!(!outcome.changes_tasks());
        assert!(outcome.changes_state());
        assert_eq!(store.state().mode(), Mode::Normal);
        assert_eq!(
            store.dispatch(Command::AddTask(draft("next"))).unwrap(),
            Outcome::Added(TaskId(11))
        );
    }

    #[test]
    fn reduce_does_not_touch_the_previous_state() {
        let state = StoreState::new(vec![make_task(1, "2024-05-01")]);
        let (next, _) = state.reduce(Command::DeleteTask(TaskId(1))).unwrap();
        assert_eq!(state.tasks().len(), 1);
        assert!(next.tasks().is_empty());
    }
}
