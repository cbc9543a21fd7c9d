use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datetime::{normalize_date, normalize_time, CalendarDate, ClockTime, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored todo. `date`/`time` are `None` when unset; on disk that is an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(with = "blank_as_none")]
    pub date: Option<CalendarDate>,
    #[serde(with = "blank_as_none")]
    pub time: Option<ClockTime>,
    #[serde(with = "flag")]
    pub completed: bool,
}

/// Form input for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub date: Option<CalendarDate>,
    pub time: Option<ClockTime>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, date: CalendarDate, time: ClockTime) -> Self {
        Self {
            title: title.into(),
            date: Some(date),
            time: Some(time),
        }
    }

    /// Builds a draft from raw form strings; unparseable date/time end up unset.
    pub fn from_input(title: &str, date: &str, time: &str) -> Self {
        Self {
            title: title.to_string(),
            date: normalize_date(date),
            time: normalize_time(time),
        }
    }
}

/// Partial edit. Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub date: Option<CalendarDate>,
    pub time: Option<ClockTime>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Builds a patch from optional raw edit fields. A date or time that was supplied
    /// but does not parse is an error, never a silent no-op.
    pub fn from_input(
        title: Option<String>,
        date: Option<&str>,
        time: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            title,
            date: date.map(str::parse::<CalendarDate>).transpose()?,
            time: time.map(str::parse::<ClockTime>).transpose()?,
            completed,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none() && self.time.is_none() && self.completed.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_coalesce_writes")]
    pub coalesce_writes: bool,
    #[serde(default)]
    pub log_spec: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            coalesce_writes: default_coalesce_writes(),
            log_spec: None,
        }
    }
}

fn default_storage_key() -> String {
    "todos".to_string()
}

fn default_coalesce_writes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

mod blank_as_none {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => serializer.collect_str(inner),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(serde::de::Error::custom(format!(
                "completed must be 0 or 1, got {other}"
            ))),
        }
    }
}
