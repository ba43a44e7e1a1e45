//! Read-only access to the hosted wait-time database.
//!
//! `WaitTimeStore` is the seam between the dashboard logic and whichever
//! backend holds the data: a direct Postgres connection ([`PgStore`]) or a
//! PostgREST endpoint ([`crate::services::postgrest::PostgrestStore`]).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;

use crate::db::models::{Park, ParkSchedule, WaitSample};
use crate::db::queries;
use crate::errors::AppError;

#[async_trait]
pub trait WaitTimeStore: Send + Sync {
    /// All parks, ordered by name.
    async fn list_parks(&self) -> Result<Vec<Park>, AppError>;

    /// Distinct civil dates with samples for a park, most recent first.
    async fn list_available_dates(&self, park_id: &str) -> Result<Vec<NaiveDate>, AppError>;

    /// Operating schedule for a park/date. `Ok(None)` when there is none.
    async fn get_schedule(
        &self,
        park_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ParkSchedule>, AppError>;

    /// One page of samples with `start <= recorded_at < end`, ascending.
    async fn list_wait_samples_page(
        &self,
        park_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<WaitSample>, AppError>;

    /// Whether the backend is reachable.
    async fn ping(&self) -> bool;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    /// Zone used to bucket samples of parks without a timezone.
    default_timezone: Tz,
}

impl PgStore {
    pub fn new(pool: PgPool, default_timezone: Tz) -> Self {
        Self {
            pool,
            default_timezone,
        }
    }
}

#[async_trait]
impl WaitTimeStore for PgStore {
    async fn list_parks(&self) -> Result<Vec<Park>, AppError> {
        Ok(queries::list_parks(&self.pool).await?)
    }

    async fn list_available_dates(&self, park_id: &str) -> Result<Vec<NaiveDate>, AppError> {
        Ok(queries::list_available_dates(&self.pool, park_id, self.default_timezone.name()).await?)
    }

    async fn get_schedule(
        &self,
        park_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ParkSchedule>, AppError> {
        Ok(queries::get_park_schedule(&self.pool, park_id, date).await?)
    }

    async fn list_wait_samples_page(
        &self,
        park_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<WaitSample>, AppError> {
        let rows = queries::list_wait_times_page(
            &self.pool,
            park_id,
            start,
            end,
            offset as i64,
            limit as i64,
        )
        .await?;
        rows.into_iter().map(WaitSample::try_from).collect()
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
