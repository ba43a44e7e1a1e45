//! Refresher status HTTP endpoint.
//!
//! GET /api/v1/refresher/status returns the current state of the background
//! wait-sample refresher as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::refresher::{RefresherState, SharedRefresherState};

/// Get the current refresher status.
///
/// Each park entry carries the park-local date whose samples were refreshed,
/// `sample_count`, `last_result` ("ok" or "error") and the `error` message.
/// The top level reports `interval_secs`, `next_refresh_at`, `total_cycles`,
/// the last cycle's duration and `cached_entries` across the gateway caches.
#[utoipa::path(
    get,
    path = "/api/v1/refresher/status",
    tag = "Refresher",
    responses(
        (status = 200, description = "Current refresher status", body = RefresherState),
    )
)]
pub async fn get_refresher_status(
    State(state): State<SharedRefresherState>,
) -> Json<RefresherState> {
    let s = state.read().await;
    Json(s.clone())
}
