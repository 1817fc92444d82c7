//! soundlog-qs library - windowed acoustic-event query service
//!
//! Serves the append-only `audio_logs` store over HTTP: raw range scans
//! for small windows, per-(class, bin) winner selection for large ones.
//! All database access is read-only.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod binning;
pub mod store;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only)
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
///
/// Dashboards fetch from other origins, so CORS stays permissive like
/// the rest of the middleware stack: trace + cors wrap every route.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/audio_logs", get(api::logs::get_audio_logs))
        .route("/api/audio_logs/count", get(api::count::get_count))
        .route("/api/yamnet_class_map", get(api::classmap::get_class_map))
        .merge(api::health::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
