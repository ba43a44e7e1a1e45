//! Attraction × time-slot grid construction.
//!
//! Turns a flat, time-ascending list of wait samples for one civil day into
//! one row per attraction (keyed by display name) holding a cell per local
//! `HH:mm` slot, plus the per-attraction average of OPERATING waits. The grid
//! is rebuilt from scratch on every refresh; nothing here is incremental.

use chrono_tz::Tz;
use std::collections::{BTreeSet, HashMap};

use crate::db::models::{ParkSchedule, WaitSample, WaitStatus};
use crate::helpers::rounded_mean;
use crate::services::timezone::{civil_time_of, format_clock_time};

/// Type label for attractions without one.
pub const DEFAULT_ATTRACTION_TYPE: &str = "Área";

/// Observation shown in one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlotCell {
    pub wait: Option<i32>,
    pub status: WaitStatus,
}

impl TimeSlotCell {
    /// Wait value when the attraction was OPERATING with a posted wait.
    pub fn operating_wait(&self) -> Option<i32> {
        match self.status {
            WaitStatus::Operating => self.wait,
            _ => None,
        }
    }
}

/// Cells of one attraction keyed by slot label, in first-insertion order.
///
/// Re-inserting an existing label replaces its cell but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotCells {
    entries: Vec<(String, TimeSlotCell)>,
    index: HashMap<String, usize>,
}

impl SlotCells {
    pub fn upsert(&mut self, label: String, cell: TimeSlotCell) {
        match self.index.get(&label) {
            Some(&i) => self.entries[i].1 = cell,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, cell));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&TimeSlotCell> {
        self.index.get(label).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TimeSlotCell)> {
        self.entries.iter().map(|(label, cell)| (label.as_str(), cell))
    }
}

/// One attraction's observations for the day.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractionRow {
    pub name: String,
    pub attraction_type: String,
    pub times: SlotCells,
    /// OPERATING wait values in arrival order (including overwritten ones).
    pub waits: Vec<i32>,
    pub avg_wait: Option<i32>,
}

impl AttractionRow {
    fn new(name: &str, attraction_type: Option<&str>) -> Self {
        let attraction_type = match attraction_type {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => DEFAULT_ATTRACTION_TYPE.to_string(),
        };
        Self {
            name: name.to_string(),
            attraction_type,
            times: SlotCells::default(),
            waits: Vec::new(),
            avg_wait: None,
        }
    }
}

/// The attraction × time-slot matrix for one park and civil day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    /// Sorted by descending average wait; rows without an average last.
    pub attractions: Vec<AttractionRow>,
    /// Every slot label seen in any row, ascending.
    pub time_slots: Vec<String>,
}

impl Grid {
    pub fn is_empty(&self) -> bool {
        self.attractions.is_empty()
    }

    pub fn attraction_names(&self) -> Vec<String> {
        self.attractions.iter().map(|a| a.name.clone()).collect()
    }
}

/// Build the grid for a day's samples.
///
/// Samples are expected to be pre-filtered to the target civil date and in
/// ascending time order; date membership is not re-checked. Rows are keyed by
/// attraction *name*, so two attractions sharing a name collapse into one row.
pub fn build_grid(samples: &[WaitSample], tz: Tz) -> Grid {
    let mut rows: Vec<AttractionRow> = Vec::new();
    let mut row_index: HashMap<&str, usize> = HashMap::new();
    let mut slots: BTreeSet<String> = BTreeSet::new();

    for sample in samples {
        let label = civil_time_of(sample.recorded_at, tz);

        let idx = *row_index
            .entry(sample.attraction_name.as_str())
            .or_insert_with(|| {
                rows.push(AttractionRow::new(
                    &sample.attraction_name,
                    sample.attraction_type.as_deref(),
                ));
                rows.len() - 1
            });
        let row = &mut rows[idx];

        row.times.upsert(
            label.clone(),
            TimeSlotCell {
                wait: sample.wait_minutes,
                status: sample.status,
            },
        );

        if let (WaitStatus::Operating, Some(wait)) = (sample.status, sample.wait_minutes) {
            row.waits.push(wait);
        }

        slots.insert(label);
    }

    for row in &mut rows {
        row.avg_wait = rounded_mean(&row.waits);
    }

    // Stable: equal averages keep encounter order.
    rows.sort_by(|a, b| match (a.avg_wait, b.avg_wait) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    Grid {
        attractions: rows,
        time_slots: slots.into_iter().collect(),
    }
}

/// Display hints for one time-slot row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlotInfo {
    pub label: String,
    /// Slot falls exactly on the hour.
    pub is_hour_mark: bool,
    /// Slot precedes regular opening on a day with early entry.
    pub is_early_entry: bool,
}

pub fn describe_slots(slots: &[String], schedule: Option<&ParkSchedule>) -> Vec<TimeSlotInfo> {
    let early_cutoff = schedule
        .filter(|s| s.early_entry.is_some())
        .map(|s| format_clock_time(Some(s.open_time)));

    slots
        .iter()
        .map(|label| TimeSlotInfo {
            label: label.clone(),
            is_hour_mark: label.ends_with(":00"),
            is_early_entry: early_cutoff
                .as_deref()
                .is_some_and(|open| label.as_str() < open),
        })
        .collect()
}
