use crate::models::{Task, TaskId};
use crate::store::{Mode, StoreState};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatePayload {
    pub tasks: Vec<Task>,
    pub mode: Mode,
    pub selection: Vec<TaskId>,
}

impl StatePayload {
    pub fn from_state(state: &StoreState) -> Self {
        Self {
            tasks: state.tasks().to_vec(),
            mode: state.mode(),
            selection: state.selection().iter().copied().collect(),
        }
    }
}

/// Receives the new state after every command that changed something.
pub trait StateObserver {
    fn state_updated(&self, payload: &StatePayload);
}
