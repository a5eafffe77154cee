//! Clan Honor Standings Backend
//!
//! Aggregates an append-only log of daily clan leaderboard snapshots into
//! calendar, hall-of-fame, chart and comparison views behind a REST API.

mod aggregate;
mod api;
mod cache;
mod config;
mod errors;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aggregate::Aggregator;
use cache::RecomputeCache;
use config::Config;
use models::{CalendarData, ChartPoint, ComparisonData, HallData};
use store::{DirectoryStore, SnapshotStore};

/// Timeline identity: the exact sequence of snapshot timestamps. A new daily
/// snapshot changes the identity and thereby invalidates every derived view.
pub type TimelineKey = Vec<i64>;

/// One cache slot per derived view, so the views never evict each other.
#[derive(Default)]
pub struct ViewCaches {
    pub calendar: RecomputeCache<TimelineKey, CalendarData>,
    pub hall: RecomputeCache<TimelineKey, HallData>,
    pub userlist: RecomputeCache<TimelineKey, Vec<String>>,
    pub comparison: RecomputeCache<(TimelineKey, i64, i64), ComparisonData>,
    pub chart: RecomputeCache<(TimelineKey, i64, i64, Vec<String>), Vec<ChartPoint>>,
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub caches: Arc<ViewCaches>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Clan Honor Standings Backend");
    tracing::info!("Snapshot directory: {:?}", config.snapshot_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Open the snapshot store
    let store = Arc::new(DirectoryStore::open(&config.snapshot_dir).await?);
    let timeline = store.timeline().await?;
    tracing::info!("Snapshot store holds {} snapshots", timeline.len());
    if timeline.is_empty() {
        tracing::warn!(
            "No snapshots recorded yet; aggregation endpoints will report data unavailable"
        );
    }

    // Create application state
    let state = AppState {
        aggregator: Arc::new(Aggregator::new(store)),
        caches: Arc::new(ViewCaches::default()),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        .route("/calendar", get(api::get_calendar))
        .route("/hall", get(api::get_hall))
        .route("/leaderboard", get(api::get_leaderboard))
        .route("/chart", post(api::post_chart))
        .route("/userlist", get(api::get_userlist));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
