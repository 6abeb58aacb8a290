//! Axum router construction for the Observer API.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use geofleet_db::EntityStore;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- plain-text liveness line
/// - `GET /health` -- status and entity counts
/// - `GET /api/vehicles` -- current vehicles
/// - `GET /api/geofences` -- geofences
/// - `GET /api/alerts` -- recent alerts (`?limit=N`)
pub fn build_router<S>(state: Arc<AppState<S>>) -> Router
where
    S: EntityStore + 'static,
{
    Router::new()
        .route("/", get(handlers::index::<S>))
        .route("/health", get(handlers::health::<S>))
        .route("/api/vehicles", get(handlers::list_vehicles::<S>))
        .route("/api/geofences", get(handlers::list_geofences::<S>))
        .route("/api/alerts", get(handlers::list_alerts::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
