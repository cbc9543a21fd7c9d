use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical storage format for task dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Day-first format written by older builds; accepted on input only.
pub const LEGACY_DATE_FORMAT: &str = "%d-%m-%Y";
pub const TIME_FORMAT: &str = "%H:%M";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    InvalidDate(String),
    InvalidTime(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty value"),
            ParseError::InvalidDate(raw) => write!(f, "invalid date: {raw:?}"),
            ParseError::InvalidTime(raw) => write!(f, "invalid time: {raw:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A calendar day. Always rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Human form used by list rows, e.g. `01 May 2024`.
    pub fn display_long(&self) -> String {
        let month = MONTHS[self.0.month0() as usize];
        format!("{:02} {} {}", self.0.day(), month, self.0.year())
    }
}

impl FromStr for CalendarDate {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ParseError::Empty);
        }
        // A four digit head means year-first; anything else is tried as the legacy layout.
        let year_first = value.split('-').next().map(str::len) == Some(4);
        let format = if year_first {
            DATE_FORMAT
        } else {
            LEGACY_DATE_FORMAT
        };
        NaiveDate::parse_from_str(value, format)
            .map(Self)
            .map_err(|_| ParseError::InvalidDate(raw.to_string()))
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Wall-clock time with minute precision, rendered as 24-hour `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl FromStr for ClockTime {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ParseError::Empty);
        }
        NaiveTime::parse_from_str(value, TIME_FORMAT)
            .map(Self)
            .map_err(|_| ParseError::InvalidTime(raw.to_string()))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses a date coming from a form or from storage. Anything unparseable becomes unset.
pub fn normalize_date(raw: &str) -> Option<CalendarDate> {
    match raw.parse::<CalendarDate>() {
        Ok(date) => Some(date),
        Err(ParseError::Empty) => None,
        Err(err) => {
            log::debug!("date normalized to unset: {err}");
            None
        }
    }
}

pub fn normalize_time(raw: &str) -> Option<ClockTime> {
    match raw.parse::<ClockTime>() {
        Ok(time) => Some(time),
        Err(ParseError::Empty) => None,
        Err(err) => {
            log::debug!("time normalized to unset: {err}");
            None
        }
    }
}

/// The local calendar day; the agenda cursor starts here.
pub fn today() -> CalendarDate {
    CalendarDate(Local::now().date_naive())
}
