//! Reads and writes the task collection under a single key of a [`KeyValueStore`].
//!
//! Decoding is deliberately forgiving: every stored entry is checked field by field
//! and defaulted, and only a payload that is not a JSON array is discarded whole.

use std::collections::HashSet;

use serde_json::Value;

use crate::datetime::{normalize_date, normalize_time};
use crate::models::{Task, TaskId};
use crate::storage::{KeyValueStore, StorageError};

pub const TODOS_KEY: &str = "todos";
/// Largest id accepted from storage (2^53 - 1, the largest integer older builds
/// could write exactly). Anything above is regenerated.
pub const MAX_STORED_ID: u64 = (1 << 53) - 1;

pub trait TaskRepository: Send + Sync {
    fn load(&self) -> Result<Vec<Task>, StorageError>;
    fn save(&self, tasks: &[Task]) -> Result<(), StorageError>;
}

pub struct KvTaskRepository<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> KvTaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, TODOS_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> TaskRepository for KvTaskRepository<S> {
    fn load(&self) -> Result<Vec<Task>, StorageError> {
        match self.store.get(&self.key)? {
            Some(raw) => decode_tasks(&raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let json = serde_json::to_string(tasks)?;
        self.store.set(&self.key, &json)
    }
}

/// Parses a stored payload. Blank text and `null` count as "nothing stored";
/// any other non-array value is treated as empty too.
pub fn decode_tasks(raw: &str) -> Result<Vec<Task>, StorageError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries = match serde_json::from_str::<Value>(raw)? {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        other => {
            log::warn!("stored todos is not an array (found {}); ignoring", kind(&other));
            return Ok(Vec::new());
        }
    };

    let mut seen = HashSet::new();
    let mut decoded: Vec<(Option<TaskId>, Task)> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let id = stored_id(entry.get("id")).filter(|id| seen.insert(*id));
        if id.is_none() {
            log::debug!("stored todo #{index} has no usable id; regenerating");
        }
        decoded.push((id, decode_entry(entry)));
    }

    // Fresh ids start above everything that survived, so they cannot collide.
    // Surviving ids are capped at MAX_STORED_ID, which leaves room for every entry.
    let mut next = seen.iter().map(|id| id.0).max().unwrap_or(0) + 1;
    Ok(decoded
        .into_iter()
        .map(|(id, mut task)| {
            task.id = id.unwrap_or_else(|| {
                let fresh = TaskId(next);
                next += 1;
                fresh
            });
            task
        })
        .collect())
}

fn decode_entry(entry: &Value) -> Task {
    if !entry.is_object() {
        log::debug!("stored todo is a {}, not an object; defaulting", kind(entry));
    }
    Task {
        id: TaskId(0),
        title: text(entry.get("title")).to_string(),
        date: normalize_date(text(entry.get("date"))),
        time: normalize_time(text(entry.get("time"))),
        completed: truthy(entry.get("completed")),
    }
}

fn stored_id(value: Option<&Value>) -> Option<TaskId> {
    let value = value?;
    let id = match value.as_u64() {
        Some(id) => id,
        // Older builds minted ids as `timestamp + random()`, which leaves a fraction.
        None => value
            .as_f64()
            .filter(|id| id.is_finite() && *id >= 0.0 && *id <= MAX_STORED_ID as f64)
            .map(|id| id.trunc() as u64)?,
    };
    (id <= MAX_STORED_ID).then_some(TaskId(id))
}

fn text(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or("")
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
