//! Park reference-data endpoints.
//!
//! - GET /api/v1/parks
//! - GET /api/v1/parks/:park_id/dates
//! - GET /api/v1/parks/:park_id/schedule?date=YYYY-MM-DD

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::{Park, ParkSchedule};
use crate::errors::{AppError, ErrorResponse};
use crate::services::gateway::DataGateway;
use crate::services::timezone::{format_clock_time, format_localized_at, parse_civil_date};

/// Selector groups, in display order. Parks not listed here are not grouped.
const PARK_GROUPS: &[(&str, &[&str])] = &[
    (
        "Walt Disney World",
        &["magic-kingdom", "epcot", "hollywood-studios", "animal-kingdom"],
    ),
    (
        "Universal Orlando",
        &["universal-studios", "islands-adventure", "epic-universe"],
    ),
    ("Others", &["seaworld", "busch-gardens"]),
];

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParkItem {
    /// Park identifier (e.g. "magic-kingdom")
    pub id: String,
    pub name: String,
    /// IANA timezone of the park; null when it uses the service default
    pub timezone: Option<String>,
}

impl From<&Park> for ParkItem {
    fn from(p: &Park) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            timezone: p.timezone.clone(),
        }
    }
}

/// A labelled group of parks for the park selector.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParkGroup {
    pub label: String,
    pub parks: Vec<ParkItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParksResponse {
    /// All parks, ordered by name
    pub parks: Vec<ParkItem>,
    pub groups: Vec<ParkGroup>,
}

/// A date with recorded samples, with its display label.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AvailableDate {
    pub date: NaiveDate,
    /// e.g. "11/01/2026 (Dom) - Hoje"
    pub label: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatesResponse {
    pub park_id: String,
    /// Most recent first
    pub dates: Vec<AvailableDate>,
}

/// A park's opening hours for one day, formatted as `HH:mm` (`--` when absent).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScheduleResponse {
    pub park_id: String,
    pub date: NaiveDate,
    pub has_early_entry: bool,
    pub early_entry: String,
    pub open_time: String,
    pub close_time: String,
}

impl From<&ParkSchedule> for ScheduleResponse {
    fn from(s: &ParkSchedule) -> Self {
        Self {
            park_id: s.park_id.clone(),
            date: s.date,
            has_early_entry: s.early_entry.is_some(),
            early_entry: format_clock_time(s.early_entry),
            open_time: format_clock_time(Some(s.open_time)),
            close_time: format_clock_time(Some(s.close_time)),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScheduleQuery {
    /// Civil date in the park's timezone (YYYY-MM-DD)
    pub date: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Group parks for the selector, keeping the input order within each group.
/// Groups without any park are omitted.
pub fn group_parks(parks: &[Park]) -> Vec<ParkGroup> {
    PARK_GROUPS
        .iter()
        .map(|(label, ids)| ParkGroup {
            label: label.to_string(),
            parks: parks
                .iter()
                .filter(|p| ids.contains(&p.id.as_str()))
                .map(ParkItem::from)
                .collect(),
        })
        .filter(|g| !g.parks.is_empty())
        .collect()
}

pub fn label_dates(dates: &[NaiveDate], tz: Tz, now: DateTime<Utc>) -> Vec<AvailableDate> {
    dates
        .iter()
        .map(|&date| AvailableDate {
            date,
            label: format_localized_at(date, tz, now),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List all parks, with selector grouping.
#[utoipa::path(
    get,
    path = "/api/v1/parks",
    tag = "Parks",
    responses(
        (status = 200, description = "Parks ordered by name, plus selector groups", body = ParksResponse),
        (status = 502, description = "Wait-time store unreachable", body = ErrorResponse),
    )
)]
pub async fn list_parks(
    State(gateway): State<DataGateway>,
) -> Result<Json<ParksResponse>, AppError> {
    let parks = gateway.list_parks().await?;
    Ok(Json(ParksResponse {
        groups: group_parks(&parks),
        parks: parks.iter().map(ParkItem::from).collect(),
    }))
}

/// Dates with recorded wait samples for a park, most recent first.
#[utoipa::path(
    get,
    path = "/api/v1/parks/{park_id}/dates",
    tag = "Parks",
    params(
        ("park_id" = String, Path, description = "Park identifier"),
    ),
    responses(
        (status = 200, description = "Available dates with display labels", body = DatesResponse),
        (status = 404, description = "Park not found", body = ErrorResponse),
    )
)]
pub async fn list_available_dates(
    State(gateway): State<DataGateway>,
    Path(park_id): Path<String>,
) -> Result<Json<DatesResponse>, AppError> {
    let park = gateway.find_park(&park_id).await?;
    let tz = gateway.park_timezone(&park)?;
    let dates = gateway.list_available_dates(&park.id).await?;
    Ok(Json(DatesResponse {
        park_id: park.id,
        dates: label_dates(&dates, tz, Utc::now()),
    }))
}

/// Operating schedule of a park on a date.
#[utoipa::path(
    get,
    path = "/api/v1/parks/{park_id}/schedule",
    tag = "Parks",
    params(
        ("park_id" = String, Path, description = "Park identifier"),
        ScheduleQuery,
    ),
    responses(
        (status = 200, description = "Formatted opening hours", body = ScheduleResponse),
        (status = 400, description = "Invalid date format", body = ErrorResponse),
        (status = 404, description = "Park or schedule not found", body = ErrorResponse),
    )
)]
pub async fn get_schedule(
    State(gateway): State<DataGateway>,
    Path(park_id): Path<String>,
    Query(params): Query<ScheduleQuery>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let date = parse_civil_date(&params.date)?;
    let park = gateway.find_park(&park_id).await?;
    let schedule = gateway.get_schedule(&park.id, date).await?.ok_or_else(|| {
        AppError::NotFound(format!("No schedule for park {} on {}", park.id, date))
    })?;
    Ok(Json(ScheduleResponse::from(&schedule)))
}
