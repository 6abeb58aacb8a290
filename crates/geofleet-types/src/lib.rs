//! Shared type definitions for the Geofleet simulator.
//!
//! This crate is the single source of truth for the entities shared by
//! the store, the simulation core, and the observer API. Display types
//! flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for vehicles, geofences, and alerts
//! - [`geo`] -- [`Coordinate`] and geometry validation
//! - [`entities`] -- Vehicle, geofence, and alert records plus insert payloads

pub mod entities;
pub mod geo;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use entities::{
    Alert, AlertView, Geofence, NewAlert, NewGeofence, NewVehicle, Vehicle, VehicleStatus,
};
pub use geo::{validate_radius, Coordinate, GeometryError};
pub use ids::{AlertId, GeofenceId, VehicleId};
