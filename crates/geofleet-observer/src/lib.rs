//! Observer API server for the Geofleet simulator.
//!
//! This crate provides a read-only Axum HTTP server over the
//! [`EntityStore`](geofleet_db::EntityStore):
//!
//! - **Liveness** (`GET /`) as a single plain-text line
//! - **Health** (`GET /health`) with vehicle and geofence counts
//! - **REST endpoints** for the current vehicles, the geofences, and the
//!   most recent alerts
//!
//! # Architecture
//!
//! Every request reads the store directly. The store only ever exposes
//! committed state, so the observer sees each vehicle either before or
//! after a tick's write for it, never in between. Nothing here mutates
//! the store.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::spawn_observer;
pub use state::AppState;
