//! The [`EntityStore`] trait: the sole mutation path for vehicles,
//! geofences, and alerts.
//!
//! Every call is a single atomic operation against the backend. Readers
//! therefore only ever observe committed state: a position update is one
//! row write, an alert insert is one row insert.
//!
//! Methods return `impl Future + Send` so the scheduler can drive a store
//! from a spawned Tokio task without boxing.

use std::future::Future;

use chrono::{DateTime, Utc};
use geofleet_types::{
    Alert, AlertView, Coordinate, Geofence, GeofenceId, NewAlert, NewGeofence, NewVehicle,
    Vehicle, VehicleId,
};

use crate::error::DbError;

/// Durable record of vehicles, geofences, and alerts.
pub trait EntityStore: Send + Sync {
    /// Return every vehicle, ordered by label.
    fn list_vehicles(&self) -> impl Future<Output = Result<Vec<Vehicle>, DbError>> + Send;

    /// Atomically replace a vehicle's position and last-updated timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidGeometry`] when `position` is out of range
    /// (the stored position is left untouched) and [`DbError::NotFound`]
    /// for an unknown vehicle.
    fn update_vehicle_position(
        &self,
        id: VehicleId,
        position: Coordinate,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Return every geofence, ordered by name.
    fn list_geofences(&self) -> impl Future<Output = Result<Vec<Geofence>, DbError>> + Send;

    /// Return the most recent alert for the pair whose creation time is
    /// strictly after `since`, if any.
    fn find_recent_alert(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Alert>, DbError>> + Send;

    /// Insert a new alert and return the stored record.
    fn insert_alert(&self, alert: NewAlert) -> impl Future<Output = Result<Alert, DbError>> + Send;

    /// Return the `limit` most recent alerts, newest first, joined with
    /// the vehicle label and geofence name.
    fn recent_alerts(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AlertView>, DbError>> + Send;

    /// Insert a vehicle at bootstrap.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidGeometry`] for an out-of-range position.
    fn insert_vehicle(
        &self,
        vehicle: NewVehicle,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vehicle, DbError>> + Send;

    /// Insert a geofence at bootstrap. Geofences are immutable afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidGeometry`] for an out-of-range center or a
    /// non-positive radius.
    fn insert_geofence(
        &self,
        geofence: NewGeofence,
    ) -> impl Future<Output = Result<Geofence, DbError>> + Send;

    /// Release backend resources. Called once, after the scheduler stopped.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
