//! Long-press multi-select for batch deletion.
//!
//! The controller only translates UI gestures into store commands; all state lives
//! in the store it drives.

use crate::models::TaskId;
use crate::store::{Command, Mode, Outcome, TaskStore, ValidationError};

/// Anything that accepts store commands: the bare [`TaskStore`] or a persisting session.
pub trait TaskDispatch {
    fn dispatch(&mut self, command: Command) -> Result<Outcome, ValidationError>;
    fn mode(&self) -> Mode;
}

impl TaskDispatch for TaskStore {
    fn dispatch(&mut self, command: Command) -> Result<Outcome, ValidationError> {
        TaskStore::dispatch(self, command)
    }

    fn mode(&self) -> Mode {
        self.state().mode()
    }
}

/// What the UI should do with a gesture after the controller has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Handled by selection mode; the UI must not run its default action.
    Consumed,
    /// Not ours; the UI runs its default action (open editor, navigate back, ...).
    Default,
}

pub struct SelectionModeController<'a, D: TaskDispatch> {
    target: &'a mut D,
}

impl<'a, D: TaskDispatch> SelectionModeController<'a, D> {
    pub fn new(target: &'a mut D) -> Self {
        Self { target }
    }

    pub fn is_active(&self) -> bool {
        self.target.mode() == Mode::SelectionActive
    }

    /// Enters selection mode if needed and toggles `id`.
    pub fn on_long_press(&mut self, id: TaskId) -> Outcome {
        if !self.is_active() {
            self.send(Command::EnterSelectionMode);
        }
        self.send(Command::ToggleChecked(id))
    }

    /// A plain tap. While selecting it toggles membership; otherwise it is left to the UI.
    pub fn on_press(&mut self, id: TaskId) -> Gesture {
        if !self.is_active() {
            return Gesture::Default;
        }
        self.send(Command::ToggleChecked(id));
        Gesture::Consumed
    }

    pub fn on_confirm_delete(&mut self) -> Outcome {
        self.send(Command::DeleteChecked)
    }

    pub fn on_cancel(&mut self) -> Outcome {
        self.send(Command::ExitSelectionMode)
    }

    /// Hardware back. While selecting it cancels selection instead of leaving the screen.
    pub fn on_back_pressed(&mut self) -> Gesture {
        if !self.is_active() {
            return Gesture::Default;
        }
        self.on_cancel();
        Gesture::Consumed
    }

    fn send(&mut self, command: Command) -> Outcome {
        // Mode commands carry no user input, so they cannot fail validation.
        match self.target.dispatch(command) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("selection command rejected: {err}");
                Outcome::Unchanged
            }
        }
    }
}
