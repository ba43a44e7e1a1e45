//! Civil date/time projection for a park's timezone.
//!
//! Wait samples are stored as UTC instants, but the dashboard buckets them by
//! the park's local calendar day and labels them with local clock times. All
//! conversions go through `chrono-tz` so daylight-saving transitions produce
//! 23- and 25-hour days instead of off-by-one-hour buckets.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::AppError;

/// Longest local-time gap (spring-forward) we walk across when local
/// midnight does not exist on a given date.
const MAX_GAP_MINUTES: i64 = 180;

/// Weekday abbreviations, indexed from Sunday.
const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"];

const TODAY_SUFFIX: &str = " - Hoje";
const YESTERDAY_SUFFIX: &str = " - Ontem";

/// Placeholder for a missing clock time.
pub const MISSING_TIME: &str = "--";

/// Parse an IANA timezone name (e.g. "America/New_York").
pub fn parse_timezone(name: &str) -> Result<Tz, AppError> {
    name.parse::<Tz>()
        .map_err(|e| AppError::InternalError(format!("Invalid timezone '{}': {}", name, e)))
}

/// Calendar date of `instant` in `tz`.
pub fn civil_date_of(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Local clock time of `instant` in `tz`, truncated to the minute (`HH:mm`).
pub fn civil_time_of(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// UTC instant of the first valid local moment of `date` in `tz`.
///
/// Normally local midnight. When midnight is ambiguous (fall-back at 00:00)
/// the earlier instant is used; when it does not exist (spring-forward at
/// 00:00) the first local minute after the gap is used.
fn local_day_start_utc(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, AppError> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=MAX_GAP_MINUTES)
        .find_map(|m| {
            tz.from_local_datetime(&(midnight + Duration::minutes(m)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            AppError::InternalError(format!("No valid local start of day for {} in {}", date, tz))
        })
}

/// UTC bounds `[start, end)` of the civil day `date` in `tz`.
///
/// `end` is the start of the following civil day, so on DST transition days
/// the span is 23 or 25 hours rather than 24.
pub fn day_bounds_utc(
    date: NaiveDate,
    tz: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| AppError::BadRequest(format!("Date {} is out of range", date)))?;
    Ok((local_day_start_utc(date, tz)?, local_day_start_utc(next, tz)?))
}

/// Today's civil date in `tz` as of `now`.
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    civil_date_of(now, tz)
}

/// Parse a `YYYY-MM-DD` civil date from a request parameter.
pub fn parse_civil_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::BadRequest(format!("Invalid date '{}': {}", s, e)))
}

/// Render `date` as `dd/MM/yyyy (Wkd)` with a relative suffix, evaluated
/// against the current time.
pub fn format_localized(date: NaiveDate, tz: Tz) -> String {
    format_localized_at(date, tz, Utc::now())
}

/// Same as [`format_localized`] with an explicit "now".
///
/// "Yesterday" is the civil predecessor of today's civil date in `tz`, never
/// `now - 24h` in UTC.
pub fn format_localized_at(date: NaiveDate, tz: Tz, now: DateTime<Utc>) -> String {
    let weekday = WEEKDAY_ABBREVIATIONS[date.weekday().num_days_from_sunday() as usize];
    let today = today_in(tz, now);

    let suffix = if date == today {
        TODAY_SUFFIX
    } else if Some(date) == today.pred_opt() {
        YESTERDAY_SUFFIX
    } else {
        ""
    };

    format!("{} ({}){}", date.format("%d/%m/%Y"), weekday, suffix)
}

/// Render a stored time-of-day as `HH:mm`, or `--` when absent.
pub fn format_clock_time(time: Option<NaiveTime>) -> String {
    match time {
        Some(t) => t.format("%H:%M").to_string(),
        None => MISSING_TIME.to_string(),
    }
}
