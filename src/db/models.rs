use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::AppError;

/// A theme park. Reference data, loaded once and cached.
#[derive(Debug, Clone, PartialEq, FromRow, Deserialize)]
pub struct Park {
    pub id: String,
    pub name: String,
    /// Identifier in the upstream wait-time feed.
    pub thrill_api_id: String,
    pub themeparks_entity_id: Option<String>,
    /// IANA timezone name (e.g. "America/New_York"). Parks without one use
    /// the configured default zone.
    pub timezone: Option<String>,
}

/// Operating hours of a park on one civil date. Times are local clock times.
#[derive(Debug, Clone, PartialEq, FromRow, Deserialize)]
pub struct ParkSchedule {
    pub id: String,
    pub park_id: String,
    pub date: NaiveDate,
    pub early_entry: Option<NaiveTime>,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

/// Attraction availability at the moment a sample was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum WaitStatus {
    Operating,
    Closed,
    Down,
}

impl FromStr for WaitStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPERATING" => Ok(WaitStatus::Operating),
            "CLOSED" => Ok(WaitStatus::Closed),
            "DOWN" => Ok(WaitStatus::Down),
            other => Err(AppError::ExternalServiceError(format!(
                "Unknown wait status '{}'",
                other
            ))),
        }
    }
}

/// One recorded wait-time observation for an attraction.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSample {
    pub attraction_id: String,
    pub attraction_name: String,
    pub attraction_type: Option<String>,
    pub recorded_at: DateTime<Utc>,
    /// Posted wait in minutes. Usually `None` when CLOSED or DOWN, but
    /// callers must check `status` rather than rely on that.
    pub wait_minutes: Option<i32>,
    pub status: WaitStatus,
}

/// Flat `wait_times ⨝ attractions` row as returned by the Postgres backend.
#[derive(Debug, Clone, FromRow)]
pub struct WaitTimeRow {
    pub attraction_id: String,
    pub attraction_name: String,
    pub attraction_type: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub wait_minutes: Option<i32>,
    pub status: String,
}

impl TryFrom<WaitTimeRow> for WaitSample {
    type Error = AppError;

    fn try_from(row: WaitTimeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse()?,
            attraction_id: row.attraction_id,
            attraction_name: row.attraction_name,
            attraction_type: row.attraction_type,
            recorded_at: row.recorded_at,
            wait_minutes: row.wait_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> WaitTimeRow {
        WaitTimeRow {
            attraction_id: "a1".to_string(),
            attraction_name: "Space Mountain".to_string(),
            attraction_type: Some("Ride".to_string()),
            recorded_at: "2026-01-11T14:00:00Z".parse().unwrap(),
            wait_minutes: Some(25),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("OPERATING".parse::<WaitStatus>().unwrap(), WaitStatus::Operating);
        assert_eq!("CLOSED".parse::<WaitStatus>().unwrap(), WaitStatus::Closed);
        assert_eq!("DOWN".parse::<WaitStatus>().unwrap(), WaitStatus::Down);
    }

    #[test]
    fn test_status_parse_unknown_fails() {
        assert!("REFURBISHMENT".parse::<WaitStatus>().is_err());
        assert!("operating".parse::<WaitStatus>().is_err());
    }

    #[test]
    fn test_status_json_uses_uppercase() {
        let json = serde_json::to_string(&WaitStatus::Down).unwrap();
        assert_eq!(json, "\"DOWN\"");
        let parsed: WaitStatus = serde_json::from_str("\"CLOSED\"").unwrap();
        assert_eq!(parsed, WaitStatus::Closed);
    }

    #[test]
    fn test_row_into_sample() {
        let sample = WaitSample::try_from(row("OPERATING")).unwrap();
        assert_eq!(sample.attraction_name, "Space Mountain");
        assert_eq!(sample.status, WaitStatus::Operating);
        assert_eq!(sample.wait_minutes, Some(25));
    }

    #[test]
    fn test_row_with_bad_status_fails_fast() {
        assert!(WaitSample::try_from(row("BROKEN")).is_err());
    }

    #[test]
    fn test_park_timezone_may_be_null() {
        let park: Park = serde_json::from_value(serde_json::json!({
            "id": "magic-kingdom",
            "name": "Magic Kingdom",
            "thrill_api_id": "6",
            "themeparks_entity_id": null,
            "timezone": null
        }))
        .unwrap();
        assert_eq!(park.timezone, None);
    }

    #[test]
    fn test_schedule_deserializes_time_strings() {
        let schedule: ParkSchedule = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "park_id": "magic-kingdom",
            "date": "2026-01-11",
            "early_entry": "08:30:00",
            "open_time": "09:00:00",
            "close_time": "22:00:00"
        }))
        .unwrap();
        assert_eq!(schedule.early_entry, NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(schedule.close_time, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
    }
}
