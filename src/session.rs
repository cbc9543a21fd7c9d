//! The running store instance the UI talks to.
//!
//! A session owns the [`TaskStore`], loads it once on `init`, hands every new task
//! collection to the save queue and tells observers about state changes. The
//! reducer itself stays free of side effects.

use std::collections::HashMap;
use std::sync::Arc;

use crate::calendar::{group_by_date, AgendaView};
use crate::datetime::CalendarDate;
use crate::events::{StatePayload, StateObserver};
use crate::models::{Settings, Task};
use crate::repository::TaskRepository;
use crate::selection::TaskDispatch;
use crate::store::{Command, Mode, Outcome, StoreState, TaskStore, ValidationError};
use crate::sync::{load_or_empty, SaveQueue};

pub struct TodoSession {
    store: TaskStore,
    repo: Arc<dyn TaskRepository>,
    saver: SaveQueue,
    observers: Vec<Box<dyn StateObserver>>,
}

impl TodoSession {
    /// Loads the stored collection and starts the writer. Must run inside a tokio runtime.
    /// The loaded collection is not written back.
    pub fn init(repo: Arc<dyn TaskRepository>, settings: &Settings) -> Self {
        let tasks = load_or_empty(repo.as_ref());
        let saver = SaveQueue::spawn(Arc::clone(&repo), settings.coalesce_writes);
        Self {
            store: TaskStore::new(tasks),
            repo,
            saver,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn StateObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &StoreState {
        self.store.state()
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.state().tasks()
    }

    pub fn grouped(&self) -> HashMap<CalendarDate, Vec<&Task>> {
        group_by_date(self.tasks())
    }

    pub fn agenda(&self, selected: CalendarDate) -> AgendaView {
        AgendaView::build(self.tasks(), selected)
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, ValidationError> {
        let outcome = match self.store.dispatch(command) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::info!("command rejected: {err}");
                return Err(err);
            }
        };
        if outcome.changes_tasks() {
            self.saver.submit(self.tasks().to_vec());
        }
        if outcome.changes_state() {
            self.notify();
        }
        Ok(outcome)
    }

    /// Drops everything held in memory (logout). Storage is left as it is.
    pub fn reset(&mut self) {
        self.apply_lifecycle(Command::Reset);
        log::info!("session reset");
    }

    /// Re-reads storage into the store, e.g. after logging back in.
    pub fn reload(&mut self) -> usize {
        let tasks = load_or_empty(self.repo.as_ref());
        let count = tasks.len();
        self.apply_lifecycle(Command::ReplaceAll(tasks));
        count
    }

    /// Waits for queued saves to finish.
    pub async fn shutdown(self) {
        self.saver.close().await;
    }

    fn apply_lifecycle(&mut self, command: Command) {
        match self.store.dispatch(command) {
            Ok(_) => self.notify(),
            Err(err) => log::error!("lifecycle command rejected: {err}"),
        }
    }

    fn notify(&self) {
        if self.observers.is_empty() {
            return;
        }
        let payload = StatePayload::from_state(self.store.state());
        for observer in &self.observers {
            observer.state_updated(&payload);
        }
    }
}

impl TaskDispatch for TodoSession {
    fn dispatch(&mut self, command: Command) -> Result<Outcome, ValidationError> {
        TodoSession::dispatch(self, command)
    }

    fn mode(&self) -> Mode {
        self.store.state().mode()
    }
}
