//! Dashboard endpoint.
//!
//! GET /api/v1/dashboard?park=&date=&attractions=a,b
//!
//! Resolves the park/date selection the same way the interactive dashboard
//! does (first park, keep-or-most-recent date, filter reset on load), loads
//! the day's schedule and samples concurrently, and returns the rendered
//! grid with its summary.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::{Park, ParkSchedule, WaitSample};
use crate::errors::{AppError, ErrorResponse};
use crate::routes::parks::{label_dates, AvailableDate, ScheduleResponse};
use crate::services::gateway::DataGateway;
use crate::services::grid::{build_grid, describe_slots, Grid};
use crate::services::selection::SelectionState;
use crate::services::severity::{classify_wait, display_cell, CellDisplay, WaitLevel};
use crate::services::summary::{summarize, BestTime, Summary};
use crate::services::timezone::{format_localized_at, parse_civil_date};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Park identifier; defaults to the first park by name
    pub park: Option<String>,
    /// Civil date (YYYY-MM-DD); defaults to the most recent date with data
    pub date: Option<String>,
    /// Comma-separated attraction names to show; all when omitted or empty
    pub attractions: Option<String>,
}

/// Split the `attractions` parameter into names, dropping blanks.
fn parse_attraction_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One grid cell as displayed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellView {
    /// No sample in this slot
    NoData,
    Closed,
    Down,
    Wait { minutes: i32, level: WaitLevel },
}

impl From<CellDisplay> for CellView {
    fn from(d: CellDisplay) -> Self {
        match d {
            CellDisplay::NoData => CellView::NoData,
            CellDisplay::Closed => CellView::Closed,
            CellDisplay::Down => CellView::Down,
            CellDisplay::Wait { minutes, level } => CellView::Wait { minutes, level },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SlotView {
    /// Local clock time "HH:mm"
    pub label: String,
    pub is_hour_mark: bool,
    pub is_early_entry: bool,
}

/// One visible attraction column; `cells` is aligned with `slots`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttractionColumn {
    pub name: String,
    pub attraction_type: String,
    pub avg_wait: Option<i32>,
    pub avg_level: Option<WaitLevel>,
    pub cells: Vec<CellView>,
}

/// Entry of the attraction filter panel.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttractionOption {
    pub name: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BestTimeView {
    pub attraction: String,
    pub time: String,
    pub wait: i32,
    pub level: WaitLevel,
}

impl From<BestTime> for BestTimeView {
    fn from(b: BestTime) -> Self {
        Self {
            level: classify_wait(b.wait),
            attraction: b.attraction,
            time: b.time,
            wait: b.wait,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SummaryView {
    pub avg: i32,
    pub avg_level: WaitLevel,
    pub min: i32,
    pub max: i32,
    /// Lowest wait of the (up to) five busiest attractions
    pub best_times: Vec<BestTimeView>,
}

impl From<Summary> for SummaryView {
    fn from(s: Summary) -> Self {
        Self {
            avg: s.avg,
            avg_level: classify_wait(s.avg),
            min: s.min,
            max: s.max,
            best_times: s.best_times.into_iter().map(BestTimeView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub park_id: Option<String>,
    pub park_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_label: Option<String>,
    pub available_dates: Vec<AvailableDate>,
    pub schedule: Option<ScheduleResponse>,
    pub slots: Vec<SlotView>,
    /// Visible attractions, busiest first
    pub attractions: Vec<AttractionColumn>,
    /// Every attraction of the day, for the filter panel
    pub attraction_options: Vec<AttractionOption>,
    /// Absent when the day has no OPERATING wait at all
    pub summary: Option<SummaryView>,
    /// False when the selected park/date has no samples
    pub has_data: bool,
}

impl DashboardResponse {
    fn empty() -> Self {
        Self {
            park_id: None,
            park_name: None,
            date: None,
            date_label: None,
            available_dates: Vec::new(),
            schedule: None,
            slots: Vec::new(),
            attractions: Vec::new(),
            attraction_options: Vec::new(),
            summary: None,
            has_data: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Everything loaded for one park/date view.
struct DayData<'a> {
    park: &'a Park,
    tz: Tz,
    date: NaiveDate,
    available_dates: &'a [NaiveDate],
    schedule: Option<ParkSchedule>,
    samples: Vec<WaitSample>,
}

fn render_dashboard(
    day: DayData<'_>,
    selection: &mut SelectionState,
    requested_attractions: Option<&str>,
    now: DateTime<Utc>,
) -> DashboardResponse {
    let grid: Grid = build_grid(&day.samples, day.tz);
    let names = grid.attraction_names();

    selection.on_attractions_loaded(&names);
    if let Some(raw) = requested_attractions {
        selection.set_visible(parse_attraction_list(raw));
    }

    let slots: Vec<SlotView> = describe_slots(&grid.time_slots, day.schedule.as_ref())
        .into_iter()
        .map(|s| SlotView {
            label: s.label,
            is_hour_mark: s.is_hour_mark,
            is_early_entry: s.is_early_entry,
        })
        .collect();

    let attractions = grid
        .attractions
        .iter()
        .filter(|row| selection.is_visible(&row.name))
        .map(|row| AttractionColumn {
            name: row.name.clone(),
            attraction_type: row.attraction_type.clone(),
            avg_wait: row.avg_wait,
            avg_level: row.avg_wait.map(classify_wait),
            cells: grid
                .time_slots
                .iter()
                .map(|slot| CellView::from(display_cell(row.times.get(slot))))
                .collect(),
        })
        .collect();

    let attraction_options = names
        .iter()
        .map(|name| AttractionOption {
            visible: selection.is_visible(name),
            name: name.clone(),
        })
        .collect();

    DashboardResponse {
        park_id: Some(day.park.id.clone()),
        park_name: Some(day.park.name.clone()),
        date: Some(day.date),
        date_label: Some(format_localized_at(day.date, day.tz, now)),
        available_dates: label_dates(day.available_dates, day.tz, now),
        schedule: day.schedule.as_ref().map(ScheduleResponse::from),
        slots,
        attractions,
        attraction_options,
        summary: summarize(&grid).map(SummaryView::from),
        has_data: !grid.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Wait-time grid and summary for one park and civil date.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard grid, schedule and summary", body = DashboardResponse),
        (status = 400, description = "Invalid date format", body = ErrorResponse),
        (status = 404, description = "Park not found", body = ErrorResponse),
        (status = 502, description = "Wait-time store unreachable", body = ErrorResponse),
    )
)]
pub async fn get_dashboard(
    State(gateway): State<DataGateway>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let requested_date = params.date.as_deref().map(parse_civil_date).transpose()?;

    let mut selection = SelectionState::new();
    let parks = gateway.list_parks().await?;
    selection.on_parks_loaded(&parks);
    if let Some(park_id) = params.park.as_deref() {
        selection.select_park(park_id);
    }

    let Some(park_id) = selection.park_id() else {
        tracing::debug!("Dashboard: no parks available");
        return Ok(Json(DashboardResponse::empty()));
    };
    let park = parks
        .iter()
        .find(|p| p.id == park_id)
        .ok_or_else(|| AppError::NotFound(format!("Park {} not found", park_id)))?;
    let tz = gateway.park_timezone(park)?;

    let available_dates = gateway.list_available_dates(&park.id).await?;
    selection.on_dates_loaded(&available_dates);
    if let Some(date) = requested_date {
        selection.select_date(date);
    }

    let Some(date) = selection.date() else {
        tracing::debug!("Dashboard: no dates with data for {}", park.id);
        let mut response = DashboardResponse::empty();
        response.park_id = Some(park.id.clone());
        response.park_name = Some(park.name.clone());
        return Ok(Json(response));
    };

    let (schedule, samples) = futures::try_join!(
        gateway.get_schedule(&park.id, date),
        gateway.list_wait_samples(park, date),
    )?;

    tracing::debug!(
        "Dashboard: {} {} -> {} samples",
        park.id,
        date,
        samples.len()
    );

    let day = DayData {
        park,
        tz,
        date,
        available_dates: &available_dates,
        schedule,
        samples,
    };
    Ok(Json(render_dashboard(
        day,
        &mut selection,
        params.attractions.as_deref(),
        Utc::now(),
    )))
}
