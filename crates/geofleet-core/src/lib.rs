//! Simulation core for Geofleet.
//!
//! This crate drives a small fleet's random-walk positions and turns
//! geofence entries into deduplicated alerts. All state lives behind the
//! [`geofleet_db::EntityStore`] trait; nothing here keeps entity copies
//! beyond a single tick.
//!
//! # Tick pipeline
//!
//! ```text
//! Scheduler -> PositionSimulator -> GeofenceMatcher -> AlertDeduplicator -> AlertEmitter
//!                     |                                        |                  |
//!                     +------------- EntityStore <-------------+------------------+
//! ```
//!
//! # Modules
//!
//! - [`geofence`] -- Haversine distance and containment matching
//! - [`dedup`] -- Time-windowed alert suppression
//! - [`emitter`] -- Alert persistence and logging
//! - [`simulator`] -- The per-tick unit of work
//! - [`scheduler`] -- Periodic timer and start/stop lifecycle
//! - [`clock`] -- Injectable wall clock
//! - [`config`] -- YAML configuration
//! - [`seed`] -- Bootstrap seeding of an empty store

pub mod clock;
pub mod config;
pub mod dedup;
pub mod emitter;
pub mod geofence;
pub mod scheduler;
pub mod seed;
pub mod simulator;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GeofleetConfig};
pub use dedup::{AlertDeduplicator, EmitDecision};
pub use emitter::AlertEmitter;
pub use geofence::{distance_m, is_contained, match_all, GeofenceMatch, EARTH_RADIUS_M};
pub use scheduler::{
    Scheduler, SchedulerError, SchedulerHandle, SchedulerReport, StopHandle, StopReason,
};
pub use seed::{seed_if_empty, SeedReport};
pub use simulator::{PositionSimulator, SimulatorSettings, TickError, TickSummary};
