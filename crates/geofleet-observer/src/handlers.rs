//! REST API endpoint handlers for the Observer server.
//!
//! All handlers are read-only queries against the shared
//! [`EntityStore`] held in [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text liveness line |
//! | `GET` | `/health` | Status with entity counts |
//! | `GET` | `/api/vehicles` | Current vehicle positions |
//! | `GET` | `/api/geofences` | Geofence definitions |
//! | `GET` | `/api/alerts` | Most recent alerts, newest first |

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use geofleet_db::EntityStore;

use crate::error::ObserverError;
use crate::state::{AppState, MAX_ALERTS_LIMIT};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/alerts` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct AlertsQuery {
    /// Maximum number of alerts to return. Defaults to the configured
    /// limit and is capped at 500.
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Plain-text liveness line.
pub async fn index<S: EntityStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    format!("geofleet observer: running (store: {})\n", state.backend)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report status and entity counts.
pub async fn health<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let vehicles = state.store.list_vehicles().await?.len();
    let geofences = state.store.list_geofences().await?.len();
    let uptime_secs = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds()
        .max(0);

    Ok(Json(serde_json::json!({
        "status": "ok",
        "store": state.backend,
        "vehicles": vehicles,
        "geofences": geofences,
        "uptime_secs": uptime_secs,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/vehicles
// ---------------------------------------------------------------------------

/// List every vehicle with its last committed position.
pub async fn list_vehicles<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let vehicles = state.store.list_vehicles().await?;
    Ok(Json(serde_json::json!({
        "count": vehicles.len(),
        "vehicles": vehicles,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/geofences
// ---------------------------------------------------------------------------

/// List every geofence.
pub async fn list_geofences<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    let geofences = state.store.list_geofences().await?;
    Ok(Json(serde_json::json!({
        "count": geofences.len(),
        "geofences": geofences,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/alerts
// ---------------------------------------------------------------------------

/// Most recent alerts joined with vehicle label and geofence name.
///
/// A malformed query string is reported through [`ObserverError`] so the
/// body keeps the JSON error shape.
pub async fn list_alerts<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<AlertsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let Query(params) = query?;
    let limit = match params.limit {
        Some(0) => {
            return Err(ObserverError::InvalidQuery(String::from(
                "limit must be at least 1",
            )));
        }
        Some(n) => n.min(MAX_ALERTS_LIMIT),
        None => state.default_alerts_limit,
    };

    let alerts = state.store.recent_alerts(limit).await?;
    Ok(Json(serde_json::json!({
        "count": alerts.len(),
        "limit": limit,
        "alerts": alerts,
    })))
}
