//! Date-indexed views over the task collection for the agenda screen.
//!
//! Everything here is derived on demand from a task slice; nothing is cached.
//! Maps are keyed by [`CalendarDate`] and their iteration order across dates is
//! unspecified. Within a single date, tasks keep collection order.

use std::collections::{HashMap, HashSet};

use crate::datetime::CalendarDate;
use crate::models::{Task, TaskId};

pub const NO_TIME_LABEL: &str = "No time set";

/// Tasks bucketed by date. Only undated tasks are left out; untitled ones are
/// still grouped, unlike earlier builds that also skipped them.
pub fn group_by_date(tasks: &[Task]) -> HashMap<CalendarDate, Vec<&Task>> {
    let mut groups: HashMap<CalendarDate, Vec<&Task>> = HashMap::new();
    for task in tasks {
        if let Some(date) = task.date {
            groups.entry(date).or_default().push(task);
        }
    }
    groups
}

pub fn dates_with_tasks(tasks: &[Task]) -> HashSet<CalendarDate> {
    tasks.iter().filter_map(|task| task.date).collect()
}

pub fn filter_for_date(tasks: &[Task], date: CalendarDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.date == Some(date))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayMarker {
    /// At least one task falls on this day.
    pub marked: bool,
    /// The agenda cursor is on this day.
    pub selected: bool,
}

/// Calendar annotations: every day with tasks is marked, and the selected day is
/// always present, whether or not it has tasks.
pub fn marked_dates(tasks: &[Task], selected: CalendarDate) -> HashMap<CalendarDate, DayMarker> {
    let mut markers: HashMap<CalendarDate, DayMarker> = dates_with_tasks(tasks)
        .into_iter()
        .map(|date| {
            let marker = DayMarker {
                marked: true,
                selected: false,
            };
            (date, marker)
        })
        .collect();
    markers.entry(selected).or_default().selected = true;
    markers
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaItem {
    pub id: TaskId,
    pub title: String,
    pub time_label: String,
    pub completed: bool,
}

impl AgendaItem {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            time_label: task
                .time
                .map(|time| time.to_string())
                .unwrap_or_else(|| NO_TIME_LABEL.to_string()),
            completed: task.completed,
        }
    }
}

/// Render model for the agenda: the day under the cursor plus calendar markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaView {
    pub selected: CalendarDate,
    pub items: Vec<AgendaItem>,
    pub markers: HashMap<CalendarDate, DayMarker>,
}

impl AgendaView {
    pub fn build(tasks: &[Task], selected: CalendarDate) -> Self {
        let items = filter_for_date(tasks, selected)
            .into_iter()
            .map(AgendaItem::from_task)
            .collect();
        Self {
            selected,
            items,
            markers: marked_dates(tasks, selected),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
