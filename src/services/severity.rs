//! Wait-time severity buckets and per-cell display classification.

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::WaitStatus;
use crate::services::grid::TimeSlotCell;

/// Five-step wait severity used to colour cells and averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WaitLevel {
    /// ≤ 20 min
    Lowest,
    /// 21–35 min
    Low,
    /// 36–59 min
    Normal,
    /// 60–79 min
    High,
    /// ≥ 80 min
    Extreme,
}

pub fn classify_wait(minutes: i32) -> WaitLevel {
    match minutes {
        i32::MIN..=20 => WaitLevel::Lowest,
        21..=35 => WaitLevel::Low,
        36..=59 => WaitLevel::Normal,
        60..=79 => WaitLevel::High,
        _ => WaitLevel::Extreme,
    }
}

/// What a single grid cell should render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellDisplay {
    /// No sample for this attraction in this slot.
    NoData,
    Closed,
    Down,
    Wait { minutes: i32, level: WaitLevel },
}

/// Classify a cell. OPERATING without a wait value renders as closed.
pub fn display_cell(cell: Option<&TimeSlotCell>) -> CellDisplay {
    match cell {
        None => CellDisplay::NoData,
        Some(c) => match (c.status, c.wait) {
            (WaitStatus::Closed, _) => CellDisplay::Closed,
            (WaitStatus::Down, _) => CellDisplay::Down,
            (WaitStatus::Operating, Some(minutes)) => CellDisplay::Wait {
                minutes,
                level: classify_wait(minutes),
            },
            (WaitStatus::Operating, None) => CellDisplay::Closed,
        },
    }
}
