pub mod calendar;
pub mod datetime;
pub mod events;
pub mod logging;
pub mod models;
pub mod repository;
pub mod selection;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;

pub use calendar::{AgendaView, DayMarker};
pub use datetime::{CalendarDate, ClockTime};
pub use models::{Settings, Task, TaskDraft, TaskId, TaskPatch};
pub use repository::{KvTaskRepository, TaskRepository};
pub use selection::{SelectionModeController, TaskDispatch};
pub use session::TodoSession;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{Command, Mode, Outcome, StoreState, TaskStore, ValidationError};
