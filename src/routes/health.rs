use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::gateway::DataGateway;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when healthy, "degraded" when the store is unreachable)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the wait-time store is reachable
    pub store: bool,
}

impl HealthResponse {
    fn from_store_status(store_ok: bool) -> Self {
        Self {
            status: if store_ok {
                "ok".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: store_ok,
        }
    }
}

/// Health check endpoint.
///
/// Returns status "degraded" (still 200) if the store is unreachable, so
/// load balancers can distinguish partial failures.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(gateway): State<DataGateway>) -> Json<HealthResponse> {
    Json(HealthResponse::from_store_status(gateway.ping().await))
}
