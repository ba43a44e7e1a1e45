//! Daily summary statistics derived from a built grid.

use crate::helpers::rounded_mean;
use crate::services::grid::Grid;

/// How many rows (from the top of the grid) get a best-time suggestion.
pub const BEST_TIMES_LIMIT: usize = 5;

/// Lowest OPERATING wait seen for one attraction, and when it first occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestTime {
    pub attraction: String,
    pub time: String,
    pub wait: i32,
}

/// Aggregate wait statistics for the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub avg: i32,
    pub min: i32,
    pub max: i32,
    pub best_times: Vec<BestTime>,
}

/// Summarize a grid, or `None` when it has no OPERATING cell with a wait.
///
/// Only the cells currently in the grid count, so a sample overwritten in its
/// slot does not contribute here even though it still counts in the row's
/// `avg_wait`.
///
/// Best times are taken from the first [`BEST_TIMES_LIMIT`] rows in grid
/// order, i.e. the attractions with the *highest* average waits.
pub fn summarize(grid: &Grid) -> Option<Summary> {
    let all_waits: Vec<i32> = grid
        .attractions
        .iter()
        .flat_map(|row| row.times.iter().filter_map(|(_, cell)| cell.operating_wait()))
        .collect();

    let avg = rounded_mean(&all_waits)?;
    let min = *all_waits.iter().min()?;
    let max = *all_waits.iter().max()?;

    let best_times = grid
        .attractions
        .iter()
        .take(BEST_TIMES_LIMIT)
        .filter_map(|row| {
            // min_by_key keeps the first of equal minima
            row.times
                .iter()
                .filter_map(|(label, cell)| cell.operating_wait().map(|w| (label, w)))
                .min_by_key(|&(_, w)| w)
                .map(|(label, wait)| BestTime {
                    attraction: row.name.clone(),
                    time: label.to_string(),
                    wait,
                })
        })
        .collect();

    Some(Summary {
        avg,
        min,
        max,
        best_times,
    })
}
