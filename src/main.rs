// Queue Planner API v0.1
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::{AppConfig, StoreBackend};
use services::gateway::{DataGateway, RETRY_BASE_DELAY};
use services::postgrest::PostgrestStore;
use services::refresher::{RefresherState, SharedRefresherState};
use services::store::{PgStore, WaitTimeStore};

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 1;

/// Queue Planner API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Queue Planner API",
        version = "0.1.0",
        description = "Theme-park wait-time dashboard API. Reads recorded attraction \
            wait samples, projects them onto each park's local civil day, and returns \
            per-day attraction grids, schedules and summary statistics.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Parks", description = "Parks, available dates and schedules"),
        (name = "Dashboard", description = "Per-day wait-time grid and summary"),
        (name = "Refresher", description = "Background wait-sample refresher status"),
    ),
    paths(
        routes::health::health_check,
        routes::parks::list_parks,
        routes::parks::list_available_dates,
        routes::parks::get_schedule,
        routes::dashboard::get_dashboard,
        routes::refresher::get_refresher_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::parks::ParkItem,
            routes::parks::ParkGroup,
            routes::parks::ParksResponse,
            routes::parks::AvailableDate,
            routes::parks::DatesResponse,
            routes::parks::ScheduleResponse,
            routes::dashboard::CellView,
            routes::dashboard::SlotView,
            routes::dashboard::AttractionColumn,
            routes::dashboard::AttractionOption,
            routes::dashboard::BestTimeView,
            routes::dashboard::SummaryView,
            routes::dashboard::DashboardResponse,
            services::severity::WaitLevel,
            services::refresher::RefresherState,
            services::refresher::ParkRefreshStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "queue_planner_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up the wait-time store
    let store: Arc<dyn WaitTimeStore> = match &config.backend {
        StoreBackend::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(DB_POOL_MAX_CONNECTIONS)
                .min_connections(DB_POOL_MIN_CONNECTIONS)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Using Postgres wait-time store");
            Arc::new(PgStore::new(pool, config.park_timezone))
        }
        StoreBackend::Postgrest { base_url, api_key } => {
            let store = PostgrestStore::new(base_url, api_key)
                .expect("Failed to build PostgREST client");
            tracing::info!("Using PostgREST wait-time store at {}", base_url);
            Arc::new(store)
        }
    };

    let gateway = DataGateway::new(
        store,
        config.park_timezone,
        config.gateway_retries,
        RETRY_BASE_DELAY,
    );

    // Create shared refresher state and spawn background refresher
    let refresher_state: SharedRefresherState =
        Arc::new(RwLock::new(RefresherState::new(config.wait_refresh_secs)));
    tokio::spawn(services::refresher::run_refresher(
        gateway.clone(),
        refresher_state.clone(),
    ));

    // CORS: read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Build router
    let api_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/parks", get(routes::parks::list_parks))
        .route(
            "/api/v1/parks/:park_id/dates",
            get(routes::parks::list_available_dates),
        )
        .route(
            "/api/v1/parks/:park_id/schedule",
            get(routes::parks::get_schedule),
        )
        .route("/api/v1/dashboard", get(routes::dashboard::get_dashboard))
        .with_state(gateway);

    // Refresher status uses SharedRefresherState
    let refresher_routes = Router::new()
        .route(
            "/api/v1/refresher/status",
            get(routes::refresher::get_refresher_status),
        )
        .with_state(refresher_state);

    let app = Router::new()
        .merge(api_routes)
        .merge(refresher_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
