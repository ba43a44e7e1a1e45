//! Data gateway: cached, retried, paginated access to a [`WaitTimeStore`].
//!
//! - Parks are cached for an hour, available dates for 5 minutes, schedules
//!   for an hour, and a day's wait samples for 2 minutes.
//! - Retryable failures (store unreachable, bad upstream response) are
//!   retried with a linearly growing delay; not-found and validation errors
//!   are returned immediately.
//! - Wait samples are fetched in pages of [`PAGE_SIZE`] until a short page
//!   comes back. Pagination order is preserved.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::db::models::{Park, ParkSchedule, WaitSample};
use crate::errors::AppError;
use crate::services::cache::TtlCache;
use crate::services::store::WaitTimeStore;
use crate::services::timezone::{day_bounds_utc, parse_timezone};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Rows requested per wait-sample page.
pub const PAGE_SIZE: usize = 1000;

const PARKS_TTL: Duration = Duration::from_secs(60 * 60);
const DATES_TTL: Duration = Duration::from_secs(5 * 60);
const SCHEDULE_TTL: Duration = Duration::from_secs(60 * 60);
const WAIT_SAMPLES_TTL: Duration = Duration::from_secs(2 * 60);

const DATES_CAPACITY: usize = 64;
const SCHEDULE_CAPACITY: usize = 512;
/// One entry is a whole park-day of samples.
const WAIT_SAMPLES_CAPACITY: usize = 128;

/// Base delay between retries; attempt `n` waits `n * RETRY_BASE_DELAY`.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

type DayKey = (String, NaiveDate);

struct GatewayInner {
    store: Arc<dyn WaitTimeStore>,
    default_timezone: Tz,
    retries: u32,
    retry_delay: Duration,
    parks: TtlCache<(), Vec<Park>>,
    dates: TtlCache<String, Vec<NaiveDate>>,
    schedules: TtlCache<DayKey, Option<ParkSchedule>>,
    wait_samples: TtlCache<DayKey, Vec<WaitSample>>,
}

/// Shared handle; cloning is cheap.
#[derive(Clone)]
pub struct DataGateway {
    inner: Arc<GatewayInner>,
}

impl DataGateway {
    pub fn new(
        store: Arc<dyn WaitTimeStore>,
        default_timezone: Tz,
        retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                store,
                default_timezone,
                retries,
                retry_delay,
                parks: TtlCache::new(1, PARKS_TTL),
                dates: TtlCache::new(DATES_CAPACITY, DATES_TTL),
                schedules: TtlCache::new(SCHEDULE_CAPACITY, SCHEDULE_TTL),
                wait_samples: TtlCache::new(WAIT_SAMPLES_CAPACITY, WAIT_SAMPLES_TTL),
            }),
        }
    }

    /// Civil timezone of a park, falling back to the configured default when
    /// the park carries none (NULL or blank).
    pub fn park_timezone(&self, park: &Park) -> Result<Tz, AppError> {
        match park.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => parse_timezone(name),
            _ => Ok(self.inner.default_timezone),
        }
    }

    pub async fn ping(&self) -> bool {
        self.inner.store.ping().await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All parks, ordered by name.
    pub async fn list_parks(&self) -> Result<Vec<Park>, AppError> {
        if let Some(parks) = self.inner.parks.get(&()) {
            return Ok(parks);
        }
        let store = &self.inner.store;
        let parks = self.with_retry("list_parks", move || store.list_parks()).await?;
        self.inner.parks.insert((), parks.clone());
        Ok(parks)
    }

    /// Look up one park by id.
    pub async fn find_park(&self, park_id: &str) -> Result<Park, AppError> {
        self.list_parks()
            .await?
            .into_iter()
            .find(|p| p.id == park_id)
            .ok_or_else(|| AppError::NotFound(format!("Park {} not found", park_id)))
    }

    /// Dates with samples for a park, most recent first.
    pub async fn list_available_dates(&self, park_id: &str) -> Result<Vec<NaiveDate>, AppError> {
        let key = park_id.to_string();
        if let Some(dates) = self.inner.dates.get(&key) {
            return Ok(dates);
        }
        let store = &self.inner.store;
        let dates = self
            .with_retry("list_available_dates", move || store.list_available_dates(park_id))
            .await?;
        self.inner.dates.insert(key, dates.clone());
        Ok(dates)
    }

    /// Schedule for a park and date. A missing schedule is cached too.
    pub async fn get_schedule(
        &self,
        park_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ParkSchedule>, AppError> {
        let key = (park_id.to_string(), date);
        if let Some(schedule) = self.inner.schedules.get(&key) {
            return Ok(schedule);
        }
        let store = &self.inner.store;
        let schedule = self
            .with_retry("get_schedule", move || store.get_schedule(park_id, date))
            .await?;
        self.inner.schedules.insert(key, schedule.clone());
        Ok(schedule)
    }

    /// Every sample of a park's civil day, ascending by `recorded_at`.
    pub async fn list_wait_samples(
        &self,
        park: &Park,
        date: NaiveDate,
    ) -> Result<Vec<WaitSample>, AppError> {
        let key = (park.id.clone(), date);
        if let Some(samples) = self.inner.wait_samples.get(&key) {
            return Ok(samples);
        }
        self.refresh_wait_samples(park, date).await
    }

    /// Fetch a day's samples from the store, bypassing and replacing the cache.
    pub async fn refresh_wait_samples(
        &self,
        park: &Park,
        date: NaiveDate,
    ) -> Result<Vec<WaitSample>, AppError> {
        let tz = self.park_timezone(park)?;
        let (start, end) = day_bounds_utc(date, tz)?;
        let store = &self.inner.store;
        let park_id = park.id.as_str();

        let fetch_start = Utc::now();
        let mut samples: Vec<WaitSample> = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .with_retry("list_wait_samples_page", move || {
                    store.list_wait_samples_page(park_id, start, end, offset, PAGE_SIZE)
                })
                .await?;
            let page_len = page.len();
            samples.extend(page);
            if page_len < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        tracing::debug!(
            "Fetched {} wait samples for {} on {} in {}ms",
            samples.len(),
            park_id,
            date,
            (Utc::now() - fetch_start).num_milliseconds()
        );

        self.inner
            .wait_samples
            .insert((park.id.clone(), date), samples.clone());
        Ok(samples)
    }

    /// Entries held across every cache.
    pub fn cached_entries(&self) -> usize {
        self.inner.parks.len()
            + self.inner.dates.len()
            + self.inner.schedules.len()
            + self.inner.wait_samples.len()
    }

    // -----------------------------------------------------------------------
    // Retry
    // -----------------------------------------------------------------------

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.inner.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying: {}",
                        operation,
                        attempt,
                        self.inner.retries + 1,
                        e
                    );
                    tokio::time::sleep(self.inner.retry_delay * attempt).await;
                }
                Err(e) => {
                    tracing::error!("{} failed: {}", operation, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WaitStatus;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory store that counts calls and can fail a number of times first.
    struct FakeStore {
        parks: Vec<Park>,
        samples: Vec<WaitSample>,
        failures_left: AtomicU32,
        failure: fn() -> AppError,
        park_calls: AtomicU32,
        schedule_calls: AtomicU32,
        pages: Mutex<Vec<(usize, usize)>>,
        windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl FakeStore {
        fn new(samples: Vec<WaitSample>) -> Self {
            Self {
                parks: vec![park("epcot", "America/New_York"), park("magic-kingdom", "")],
                samples,
                failures_left: AtomicU32::new(0),
                failure: || AppError::ExternalServiceError("connection reset".into()),
                park_calls: AtomicU32::new(0),
                schedule_calls: AtomicU32::new(0),
                pages: Mutex::new(Vec::new()),
                windows: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, times: u32, failure: fn() -> AppError) -> Self {
            self.failures_left = AtomicU32::new(times);
            self.failure = failure;
            self
        }

        fn maybe_fail(&self) -> Result<(), AppError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err((self.failure)());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WaitTimeStore for FakeStore {
        async fn list_parks(&self) -> Result<Vec<Park>, AppError> {
            self.park_calls.fetch_add(1, Ordering::SeqCst);
            self.maybe_fail()?;
            Ok(self.parks.clone())
        }

        async fn list_available_dates(&self, _park_id: &str) -> Result<Vec<NaiveDate>, AppError> {
            self.maybe_fail()?;
            Ok(vec![NaiveDate::from_ymd_opt(2026, 1, 11).unwrap()])
        }

        async fn get_schedule(
            &self,
            _park_id: &str,
            _date: NaiveDate,
        ) -> Result<Option<ParkSchedule>, AppError> {
            self.schedule_calls.fetch_add(1, Ordering::SeqCst);
            self.maybe_fail()?;
            Ok(None)
        }

        async fn list_wait_samples_page(
            &self,
            _park_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<WaitSample>, AppError> {
            self.maybe_fail()?;
            self.pages.lock().unwrap().push((offset, limit));
            self.windows.lock().unwrap().push((start, end));
            Ok(self
                .samples
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn ping(&self) -> bool {
            true
        }
    }

    fn park(id: &str, timezone: &str) -> Park {
        Park {
            id: id.to_string(),
            name: id.to_string(),
            thrill_api_id: id.to_string(),
            themeparks_entity_id: None,
            timezone: Some(timezone.to_string()),
        }
    }

    fn samples(n: usize) -> Vec<WaitSample> {
        let base = Utc.with_ymd_and_hms(2026, 1, 11, 14, 0, 0).unwrap();
        (0..n)
            .map(|i| WaitSample {
                attraction_id: format!("a{}", i % 7),
                attraction_name: format!("Attraction {}", i % 7),
                attraction_type: None,
                recorded_at: base + chrono::Duration::seconds(i as i64),
                wait_minutes: Some((i % 90) as i32),
                status: WaitStatus::Operating,
            })
            .collect()
    }

    fn gateway(store: Arc<FakeStore>, retries: u32) -> DataGateway {
        DataGateway::new(store, chrono_tz::America::Chicago, retries, Duration::ZERO)
    }

    fn jan11() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 11).unwrap()
    }

    #[tokio::test]
    async fn test_pagination_fetches_until_short_page() {
        let store = Arc::new(FakeStore::new(samples(2500)));
        let gw = gateway(store.clone(), 0);

        let result = gw
            .list_wait_samples(&park("epcot", "America/New_York"), jan11())
            .await
            .unwrap();

        assert_eq!(result.len(), 2500);
        assert_eq!(
            *store.pages.lock().unwrap(),
            vec![(0, 1000), (1000, 1000), (2000, 1000)]
        );
        // Order preserved across pages
        assert!(result.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
    }

    #[tokio::test]
    async fn test_exact_page_multiple_requests_one_empty_page() {
        let store = Arc::new(FakeStore::new(samples(1000)));
        let gw = gateway(store.clone(), 0);

        let result = gw
            .list_wait_samples(&park("epcot", "America/New_York"), jan11())
            .await
            .unwrap();

        assert_eq!(result.len(), 1000);
        assert_eq!(store.pages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_day_window_uses_park_timezone() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store.clone(), 0);

        gw.list_wait_samples(&park("epcot", "America/New_York"), jan11())
            .await
            .unwrap();

        let windows = store.windows.lock().unwrap();
        assert_eq!(windows[0].0, Utc.with_ymd_and_hms(2026, 1, 11, 5, 0, 0).unwrap());
        assert_eq!(windows[0].1, Utc.with_ymd_and_hms(2026, 1, 12, 5, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_missing_park_timezone_falls_back_to_default() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store.clone(), 0);
        let null_tz = Park {
            timezone: None,
            ..park("magic-kingdom", "")
        };
        let empty_tz = park("animal-kingdom", "");
        let blank_tz = park("hollywood-studios", "  ");

        for p in [&null_tz, &empty_tz, &blank_tz] {
            assert_eq!(gw.park_timezone(p).unwrap(), chrono_tz::America::Chicago);
            gw.list_wait_samples(p, jan11()).await.unwrap();
        }

        // Chicago midnight is 06:00 UTC in January
        let chicago_day = (
            Utc.with_ymd_and_hms(2026, 1, 11, 6, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 12, 6, 0, 0).unwrap(),
        );
        assert_eq!(*store.windows.lock().unwrap(), vec![chicago_day; 3]);
    }

    #[tokio::test]
    async fn test_invalid_park_timezone_is_error() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store, 0);
        let result = gw
            .list_wait_samples(&park("epcot", "Mars/Olympus_Mons"), jan11())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_wait_samples_are_cached_and_refresh_bypasses() {
        let store = Arc::new(FakeStore::new(samples(3)));
        let gw = gateway(store.clone(), 0);
        let epcot = park("epcot", "America/New_York");

        gw.list_wait_samples(&epcot, jan11()).await.unwrap();
        gw.list_wait_samples(&epcot, jan11()).await.unwrap();
        assert_eq!(store.pages.lock().unwrap().len(), 1);

        gw.refresh_wait_samples(&epcot, jan11()).await.unwrap();
        assert_eq!(store.pages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_parks_cached() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store.clone(), 0);

        assert_eq!(gw.list_parks().await.unwrap().len(), 2);
        assert_eq!(gw.find_park("epcot").await.unwrap().id, "epcot");
        assert_eq!(store.park_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_park_is_not_found() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store, 0);
        let err = gw.find_park("atlantis").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_schedule_is_cached() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store.clone(), 0);

        assert_eq!(gw.get_schedule("epcot", jan11()).await.unwrap(), None);
        assert_eq!(gw.get_schedule("epcot", jan11()).await.unwrap(), None);
        assert_eq!(store.schedule_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried() {
        let store = Arc::new(FakeStore::new(Vec::new()).failing(2, || {
            AppError::ExternalServiceError("connection reset".into())
        }));
        let gw = gateway(store.clone(), 2);

        assert_eq!(gw.list_parks().await.unwrap().len(), 2);
        assert_eq!(store.park_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let store = Arc::new(FakeStore::new(Vec::new()).failing(5, || {
            AppError::ExternalServiceError("connection reset".into())
        }));
        let gw = gateway(store.clone(), 2);

        assert!(gw.list_parks().await.is_err());
        assert_eq!(store.park_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_final() {
        let store = Arc::new(
            FakeStore::new(Vec::new()).failing(1, || AppError::BadRequest("bad filter".into())),
        );
        let gw = gateway(store.clone(), 2);

        assert!(matches!(
            gw.list_parks().await.unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert_eq!(store.park_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_query_is_not_cached() {
        let store = Arc::new(FakeStore::new(Vec::new()).failing(1, || {
            AppError::ExternalServiceError("connection reset".into())
        }));
        let gw = gateway(store.clone(), 0);

        assert!(gw.list_parks().await.is_err());
        assert!(gw.list_parks().await.is_ok());
        assert_eq!(store.park_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sample_cache_stays_bounded_across_many_days() {
        let store = Arc::new(FakeStore::new(Vec::new()));
        let gw = gateway(store, 0);
        let epcot = park("epcot", "America/New_York");
        let first = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        tokio_test::block_on(async {
            for day in 0..3000 {
                let date = first + chrono::Duration::days(day);
                gw.list_wait_samples(&epcot, date).await.unwrap();
            }
        });

        assert!(
            gw.cached_entries() <= 2 * WAIT_SAMPLES_CAPACITY,
            "gateway held {} entries",
            gw.cached_entries()
        );
    }
}
