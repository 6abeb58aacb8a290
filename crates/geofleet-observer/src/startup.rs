//! Observer server startup helper for embedding in the engine.
//!
//! [`spawn_observer`] binds the listener eagerly, so a port conflict is
//! reported to the engine at startup, then serves on a background Tokio
//! task. The engine aborts the returned handle during shutdown.

use std::sync::Arc;

use geofleet_db::EntityStore;
use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Bind `config` and serve the Observer API on a background task.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or in use.
pub async fn spawn_observer<S>(
    config: &ServerConfig,
    state: Arc<AppState<S>>,
) -> Result<JoinHandle<()>, ServerError>
where
    S: EntityStore + 'static,
{
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(host = %config.host, port = config.port, "Observer server spawned on background task");

    Ok(handle)
}
