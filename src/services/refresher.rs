//! Background refresher for today's wait samples.
//!
//! Wait-time data is collected upstream roughly every 10 minutes. The
//! refresher re-reads each park's current civil day on the same cadence so
//! dashboard requests for "today" are served from a warm cache.
//!
//! - On each cycle: list parks, then refresh today's samples per park
//! - One park failing does not stop the others
//! - State is in-memory (`Arc<RwLock<RefresherState>>`), exposed by the
//!   status endpoint

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::db::models::Park;
use crate::errors::AppError;
use crate::services::gateway::DataGateway;
use crate::services::timezone::today_in;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Sleep when the park list itself cannot be loaded (seconds).
const REFRESHER_ERROR_SLEEP_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Refresher state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Outcome of the last refresh of one park.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParkRefreshStatus {
    pub park_id: String,
    pub park_name: String,
    /// Civil date (in the park's timezone) that was refreshed.
    pub date: Option<NaiveDate>,
    pub sample_count: usize,
    pub refreshed_at: DateTime<Utc>,
    /// "ok" or "error"
    pub last_result: String,
    pub error: Option<String>,
}

/// Global refresher state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefresherState {
    pub active: bool,
    pub interval_secs: u64,
    pub next_refresh_at: Option<DateTime<Utc>>,
    pub last_cycle_completed_at: Option<DateTime<Utc>>,
    pub last_cycle_duration_ms: Option<u64>,
    pub total_cycles: u64,
    /// Entries held by the gateway caches after the last cycle.
    pub cached_entries: usize,
    pub parks: Vec<ParkRefreshStatus>,
}

impl RefresherState {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            active: true,
            interval_secs,
            next_refresh_at: None,
            last_cycle_completed_at: None,
            last_cycle_duration_ms: None,
            total_cycles: 0,
            cached_entries: 0,
            parks: Vec::new(),
        }
    }
}

/// Shared refresher state handle.
pub type SharedRefresherState = Arc<RwLock<RefresherState>>;

// ---------------------------------------------------------------------------
// Main refresher loop
// ---------------------------------------------------------------------------

/// Run the background refresher. Never returns.
///
/// Should be spawned via `tokio::spawn(run_refresher(...))`.
pub async fn run_refresher(gateway: DataGateway, state: SharedRefresherState) {
    let interval_secs = state.read().await.interval_secs;
    tracing::info!("Background refresher started (every {}s)", interval_secs);

    loop {
        let sleep_for = match refresh_cycle(&gateway, &state, Utc::now()).await {
            Ok(()) => interval_secs,
            Err(e) => {
                tracing::error!("Refresher: failed to list parks: {}", e);
                REFRESHER_ERROR_SLEEP_SECS
            }
        };
        {
            let mut s = state.write().await;
            s.next_refresh_at = Some(Utc::now() + Duration::seconds(sleep_for as i64));
        }
        sleep_secs(sleep_for).await;
    }
}

/// Refresh today's samples for every park once and publish the outcome.
pub async fn refresh_cycle(
    gateway: &DataGateway,
    state: &SharedRefresherState,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let cycle_start = Utc::now();
    let parks = gateway.list_parks().await?;

    let mut statuses = Vec::with_capacity(parks.len());
    for park in &parks {
        let status = refresh_park(gateway, park, now).await;
        // Publish intermediate state so the status endpoint is useful mid-cycle
        statuses.push(status);
        state.write().await.parks = statuses.clone();
    }

    let ok = statuses.iter().filter(|s| s.last_result == "ok").count();
    let duration_ms = (Utc::now() - cycle_start).num_milliseconds().max(0) as u64;
    tracing::info!(
        "Refresher: cycle complete, {}/{} parks refreshed in {}ms",
        ok,
        statuses.len(),
        duration_ms
    );

    let mut s = state.write().await;
    s.parks = statuses;
    s.total_cycles += 1;
    s.cached_entries = gateway.cached_entries();
    s.last_cycle_completed_at = Some(Utc::now());
    s.last_cycle_duration_ms = Some(duration_ms);
    Ok(())
}

async fn refresh_park(gateway: &DataGateway, park: &Park, now: DateTime<Utc>) -> ParkRefreshStatus {
    let mut status = ParkRefreshStatus {
        park_id: park.id.clone(),
        park_name: park.name.clone(),
        date: None,
        sample_count: 0,
        refreshed_at: Utc::now(),
        last_result: "error".to_string(),
        error: None,
    };

    let tz = match gateway.park_timezone(park) {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!("Refresher: {} has an invalid timezone: {}", park.id, e);
            status.error = Some(e.to_string());
            return status;
        }
    };
    let today = today_in(tz, now);
    status.date = Some(today);

    match gateway.refresh_wait_samples(park, today).await {
        Ok(samples) => {
            tracing::debug!(
                "Refresher: {} {} -> {} samples",
                park.id,
                today,
                samples.len()
            );
            status.sample_count = samples.len();
            status.last_result = "ok".to_string();
        }
        Err(e) => {
            tracing::warn!("Refresher: failed to refresh {}: {}", park.id, e);
            status.error = Some(e.to_string());
        }
    }
    status.refreshed_at = Utc::now();
    status
}

async fn sleep_secs(secs: u64) {
    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ParkSchedule, WaitSample, WaitStatus};
    use crate::services::store::WaitTimeStore;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct StubStore {
        parks: Result<Vec<Park>, String>,
    }

    #[async_trait]
    impl WaitTimeStore for StubStore {
        async fn list_parks(&self) -> Result<Vec<Park>, AppError> {
            self.parks
                .clone()
                .map_err(AppError::ExternalServiceError)
        }

        async fn list_available_dates(&self, _: &str) -> Result<Vec<NaiveDate>, AppError> {
            Ok(Vec::new())
        }

        async fn get_schedule(
            &self,
            _: &str,
            _: NaiveDate,
        ) -> Result<Option<ParkSchedule>, AppError> {
            Ok(None)
        }

        async fn list_wait_samples_page(
            &self,
            park_id: &str,
            start: DateTime<Utc>,
            _end: DateTime<Utc>,
            offset: usize,
            _limit: usize,
        ) -> Result<Vec<WaitSample>, AppError> {
            if park_id == "broken" {
                return Err(AppError::ExternalServiceError("timeout".into()));
            }
            if offset > 0 {
                return Ok(Vec::new());
            }
            Ok(vec![WaitSample {
                attraction_id: "a".into(),
                attraction_name: "A".into(),
                attraction_type: None,
                recorded_at: start,
                wait_minutes: Some(15),
                status: WaitStatus::Operating,
            }])
        }

        async fn ping(&self) -> bool {
            true
        }
    }

    fn park(id: &str, timezone: &str) -> Park {
        Park {
            id: id.to_string(),
            name: id.to_uppercase(),
            thrill_api_id: id.to_string(),
            themeparks_entity_id: None,
            timezone: Some(timezone.to_string()),
        }
    }

    fn setup(parks: Result<Vec<Park>, String>) -> (DataGateway, SharedRefresherState) {
        let gateway = DataGateway::new(
            Arc::new(StubStore { parks }),
            chrono_tz::America::New_York,
            0,
            std::time::Duration::ZERO,
        );
        (gateway, Arc::new(RwLock::new(RefresherState::new(600))))
    }

    #[tokio::test]
    async fn test_cycle_refreshes_today_per_park() {
        let (gateway, state) = setup(Ok(vec![
            park("epcot", "America/New_York"),
            park("broken", "America/New_York"),
            park("nowhere", "Not/AZone"),
        ]));
        // 03:00 UTC on Jan 12 is still Jan 11 in New York
        let now = Utc.with_ymd_and_hms(2026, 1, 12, 3, 0, 0).unwrap();

        refresh_cycle(&gateway, &state, now).await.unwrap();

        let s = state.read().await;
        assert_eq!(s.total_cycles, 1);
        assert!(s.last_cycle_completed_at.is_some());
        assert_eq!(s.parks.len(), 3);
        // The park list plus epcot's day of samples
        assert_eq!(s.cached_entries, 2);

        assert_eq!(s.parks[0].last_result, "ok");
        assert_eq!(s.parks[0].sample_count, 1);
        assert_eq!(s.parks[0].date, NaiveDate::from_ymd_opt(2026, 1, 11));

        assert_eq!(s.parks[1].last_result, "error");
        assert!(s.parks[1].error.is_some());

        assert_eq!(s.parks[2].last_result, "error");
        assert_eq!(s.parks[2].date, None);
    }

    #[tokio::test]
    async fn test_cycle_fails_when_parks_unavailable() {
        let (gateway, state) = setup(Err("down".to_string()));
        let now = Utc.with_ymd_and_hms(2026, 1, 12, 3, 0, 0).unwrap();

        assert!(refresh_cycle(&gateway, &state, now).await.is_err());
        assert_eq!(state.read().await.total_cycles, 0);
    }

    #[test]
    fn test_new_state() {
        let s = RefresherState::new(600);
        assert!(s.active);
        assert_eq!(s.interval_secs, 600);
        assert!(s.parks.is_empty());
    }
}
