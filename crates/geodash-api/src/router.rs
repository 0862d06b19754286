use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the router of spec §6.1's primary routes plus its legacy aliases, all backed by the
/// same handler functions. CORS is permissive and request tracing is unconditional (spec §10
/// supplement); neither is part of the core's contract.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/status", get(handlers::status))
        .route("/api/cities/search", get(handlers::search))
        .route("/api/city/{id}", get(handlers::get_city))
        .route("/api/cities/coordinates", get(handlers::coordinates))
        .route("/api/countries", get(handlers::countries))
        .route("/api/states", get(handlers::states_query))
        .route("/api/cities/state", get(handlers::cities_in_state_query))
        // Legacy aliases (spec §6.1).
        .route("/api/search", get(handlers::search))
        .route("/api/coordinates", get(handlers::coordinates))
        .route("/api/cities/{id}", get(handlers::get_city))
        .route("/api/countries/{country}/states", get(handlers::states_path))
        .route("/api/countries/{country}/states/{state}/cities", get(handlers::cities_in_state_path))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive().max_age(Duration::from_secs(3600)))
}
