//! PostgREST (Supabase REST) client for the wait-time database.
//!
//! Mirrors the queries of the Postgres backend over HTTP:
//! - `GET  /rest/v1/parks` ordered by name
//! - `POST /rest/v1/rpc/get_available_dates` (server-side DISTINCT)
//! - `GET  /rest/v1/park_schedules` as a single object (406 + PGRST116 = none)
//! - `GET  /rest/v1/wait_times` joined to attractions, paged with offset/limit

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::db::models::{Park, ParkSchedule, WaitSample, WaitStatus};
use crate::errors::AppError;
use crate::services::store::WaitTimeStore;

const REST_PREFIX: &str = "/rest/v1";

/// Media type asking PostgREST for exactly one row as a bare object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST error code for "zero (or many) rows for a single-object request".
const NO_ROWS_CODE: &str = "PGRST116";

const PARK_COLUMNS: &str = "id,name,thrill_api_id,themeparks_entity_id,timezone";
const WAIT_TIME_SELECT: &str = "*,attractions!inner(id,name,type,park_id)";

/// Client for a Supabase/PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- PostgREST JSON response types ---

#[derive(Debug, Deserialize)]
struct AvailableDateRow {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct WaitTimeRecord {
    recorded_at: DateTime<Utc>,
    wait_minutes: Option<i32>,
    status: WaitStatus,
    attractions: AttractionRef,
}

#[derive(Debug, Deserialize)]
struct AttractionRef {
    id: String,
    name: String,
    #[serde(rename = "type")]
    attraction_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl From<WaitTimeRecord> for WaitSample {
    fn from(r: WaitTimeRecord) -> Self {
        Self {
            attraction_id: r.attractions.id,
            attraction_name: r.attractions.name,
            attraction_type: r.attractions.attraction_type,
            recorded_at: r.recorded_at,
            wait_minutes: r.wait_minutes,
            status: r.status,
        }
    }
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PREFIX, path)
    }

    fn auth_headers(&self) -> Result<HeaderMap, AppError> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            AppError::InternalError(format!("Invalid API key header: {}", e))
        };
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(invalid)?,
        );
        Ok(headers)
    }

    /// Turn a non-2xx response into an `ExternalServiceError`.
    async fn ensure_success(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::ExternalServiceError(format!(
            "PostgREST {} returned HTTP {}: {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl WaitTimeStore for PostgrestStore {
    async fn list_parks(&self) -> Result<Vec<Park>, AppError> {
        let response = self
            .client
            .get(self.url("parks"))
            .headers(self.auth_headers()?)
            .query(&[("select", PARK_COLUMNS), ("order", "name.asc")])
            .send()
            .await?;
        let response = Self::ensure_success(response, "parks").await?;
        response.json::<Vec<Park>>().await.map_err(|e| {
            AppError::ExternalServiceError(format!("PostgREST parks JSON error: {}", e))
        })
    }

    async fn list_available_dates(&self, park_id: &str) -> Result<Vec<NaiveDate>, AppError> {
        let response = self
            .client
            .post(self.url("rpc/get_available_dates"))
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({ "p_park_id": park_id }))
            .send()
            .await?;
        let response = Self::ensure_success(response, "get_available_dates").await?;
        let rows: Vec<AvailableDateRow> = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("PostgREST dates JSON error: {}", e))
        })?;
        Ok(rows.into_iter().map(|r| r.date).collect())
    }

    async fn get_schedule(
        &self,
        park_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ParkSchedule>, AppError> {
        let park_filter = format!("eq.{}", park_id);
        let date_filter = format!("eq.{}", date.format("%Y-%m-%d"));

        let response = self
            .client
            .get(self.url("park_schedules"))
            .headers(self.auth_headers()?)
            .header(ACCEPT, SINGLE_OBJECT)
            .query(&[
                ("select", "*"),
                ("park_id", park_filter.as_str()),
                ("date", date_filter.as_str()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_ACCEPTABLE {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<PostgrestErrorBody>(&body).ok();
            if parsed.as_ref().and_then(|b| b.code.as_deref()) == Some(NO_ROWS_CODE) {
                return Ok(None);
            }
            let message = parsed.and_then(|b| b.message).unwrap_or(body);
            return Err(AppError::ExternalServiceError(format!(
                "PostgREST park_schedules returned HTTP {}: {}",
                status, message
            )));
        }

        let response = Self::ensure_success(response, "park_schedules").await?;
        let schedule = response.json::<ParkSchedule>().await.map_err(|e| {
            AppError::ExternalServiceError(format!("PostgREST schedule JSON error: {}", e))
        })?;
        Ok(Some(schedule))
    }

    async fn list_wait_samples_page(
        &self,
        park_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<WaitSample>, AppError> {
        let park_filter = format!("eq.{}", park_id);
        let start_filter = format!("gte.{}", start.to_rfc3339_opts(SecondsFormat::Millis, true));
        let end_filter = format!("lt.{}", end.to_rfc3339_opts(SecondsFormat::Millis, true));
        let offset = offset.to_string();
        let limit = limit.to_string();

        let response = self
            .client
            .get(self.url("wait_times"))
            .headers(self.auth_headers()?)
            .query(&[
                ("select", WAIT_TIME_SELECT),
                ("attractions.park_id", park_filter.as_str()),
                ("recorded_at", start_filter.as_str()),
                ("recorded_at", end_filter.as_str()),
                ("order", "recorded_at.asc"),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let response = Self::ensure_success(response, "wait_times").await?;
        let records: Vec<WaitTimeRecord> = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("PostgREST wait_times JSON error: {}", e))
        })?;
        Ok(records.into_iter().map(WaitSample::from).collect())
    }

    async fn ping(&self) -> bool {
        let headers = match self.auth_headers() {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.client
            .get(self.url("parks"))
            .headers(headers)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
