use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use super::models::{Park, ParkSchedule, WaitTimeRow};

/// List all parks, ordered by name.
pub async fn list_parks(pool: &PgPool) -> Result<Vec<Park>, sqlx::Error> {
    sqlx::query_as::<_, Park>(
        "SELECT id::text AS id, name, thrill_api_id, themeparks_entity_id, timezone
         FROM parks
         ORDER BY name",
    )
    .fetch_all(pool)
    .await
}

/// Distinct civil dates (in the park's own timezone, or `default_timezone`
/// when the park has none) that have wait samples, most recent first.
pub async fn list_available_dates(
    pool: &PgPool,
    park_id: &str,
    default_timezone: &str,
) -> Result<Vec<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar::<_, NaiveDate>(
        "SELECT DISTINCT
                (w.recorded_at AT TIME ZONE COALESCE(NULLIF(TRIM(p.timezone), ''), $2))::date AS date
         FROM wait_times w
         JOIN attractions a ON a.id = w.attraction_id
         JOIN parks p ON p.id = a.park_id
         WHERE a.park_id::text = $1
         ORDER BY date DESC",
    )
    .bind(park_id)
    .bind(default_timezone)
    .fetch_all(pool)
    .await
}

/// Get the operating schedule for a park on a civil date, if one exists.
pub async fn get_park_schedule(
    pool: &PgPool,
    park_id: &str,
    date: NaiveDate,
) -> Result<Option<ParkSchedule>, sqlx::Error> {
    sqlx::query_as::<_, ParkSchedule>(
        "SELECT id::text AS id, park_id::text AS park_id, date, early_entry, open_time, close_time
         FROM park_schedules
         WHERE park_id::text = $1 AND date = $2",
    )
    .bind(park_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// One page of wait samples for a park in `[start, end)`, ascending by time.
pub async fn list_wait_times_page(
    pool: &PgPool,
    park_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    offset: i64,
    limit: i64,
) -> Result<Vec<WaitTimeRow>, sqlx::Error> {
    sqlx::query_as::<_, WaitTimeRow>(
        "SELECT w.attraction_id::text AS attraction_id,
                a.name AS attraction_name,
                a.type AS attraction_type,
                w.recorded_at, w.wait_minutes, w.status::text AS status
         FROM wait_times w
         JOIN attractions a ON a.id = w.attraction_id
         WHERE a.park_id::text = $1
           AND w.recorded_at >= $2
           AND w.recorded_at < $3
         ORDER BY w.recorded_at, w.id
         OFFSET $4
         LIMIT $5",
    )
    .bind(park_id)
    .bind(start)
    .bind(end)
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await
}
