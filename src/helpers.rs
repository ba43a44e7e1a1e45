//! Shared numeric helpers for wait-time aggregation.
//!
//! Averages shown on the dashboard are whole minutes, rounded half-up
//! (2.5 → 3) so that the attraction headers and the daily summary agree
//! with each other regardless of which one computed the mean.

/// Rounded arithmetic mean of a set of wait values, in whole minutes.
///
/// Returns `None` for an empty slice.
pub(crate) fn rounded_mean(values: &[i32]) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    let mean = sum as f64 / values.len() as f64;
    Some((mean + 0.5).floor() as i32)
}
