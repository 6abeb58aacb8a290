//! Shared application state for the Observer API server.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Upper bound on `limit` for `GET /api/alerts`.
pub const MAX_ALERTS_LIMIT: usize = 500;

/// State shared by every handler: the store plus a few display settings.
#[derive(Debug)]
pub struct AppState<S> {
    /// The entity store, shared with the simulator.
    pub store: Arc<S>,
    /// Backend name reported by `/health`.
    pub backend: &'static str,
    /// `limit` used by `/api/alerts` when the query omits it.
    pub default_alerts_limit: usize,
    /// When the observer state was created.
    pub started_at: DateTime<Utc>,
}

impl<S> AppState<S> {
    /// Create state over `store`.
    pub fn new(store: Arc<S>, backend: &'static str, default_alerts_limit: usize) -> Self {
        Self {
            store,
            backend,
            default_alerts_limit: default_alerts_limit.clamp(1, MAX_ALERTS_LIMIT),
            started_at: Utc::now(),
        }
    }
}
