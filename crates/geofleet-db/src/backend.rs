//! Runtime choice between the `PostgreSQL` and in-memory stores.
//!
//! The engine decides the backend from configuration (and falls back to
//! memory when allowed), so it needs one concrete type that implements
//! [`EntityStore`] either way.

use chrono::{DateTime, Utc};
use geofleet_types::{
    Alert, AlertView, Coordinate, Geofence, GeofenceId, NewAlert, NewGeofence, NewVehicle,
    Vehicle, VehicleId,
};

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::pg_store::PostgresStore;
use crate::store::EntityStore;

/// An [`EntityStore`] selected at startup.
pub enum StoreBackend {
    /// Durable `PostgreSQL` storage.
    Postgres(PostgresStore),
    /// Process-local storage; lost on exit.
    Memory(MemoryStore),
}

impl StoreBackend {
    /// Short backend name for logs and the health endpoint.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl EntityStore for StoreBackend {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DbError> {
        match self {
            Self::Postgres(s) => s.list_vehicles().await,
            Self::Memory(s) => s.list_vehicles().await,
        }
    }

    async fn update_vehicle_position(
        &self,
        id: VehicleId,
        position: Coordinate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        match self {
            Self::Postgres(s) => s.update_vehicle_position(id, position, updated_at).await,
            Self::Memory(s) => s.update_vehicle_position(id, position, updated_at).await,
        }
    }

    async fn list_geofences(&self) -> Result<Vec<Geofence>, DbError> {
        match self {
            Self::Postgres(s) => s.list_geofences().await,
            Self::Memory(s) => s.list_geofences().await,
        }
    }

    async fn find_recent_alert(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, DbError> {
        match self {
            Self::Postgres(s) => s.find_recent_alert(vehicle_id, geofence_id, since).await,
            Self::Memory(s) => s.find_recent_alert(vehicle_id, geofence_id, since).await,
        }
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, DbError> {
        match self {
            Self::Postgres(s) => s.insert_alert(alert).await,
            Self::Memory(s) => s.insert_alert(alert).await,
        }
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertView>, DbError> {
        match self {
            Self::Postgres(s) => s.recent_alerts(limit).await,
            Self::Memory(s) => s.recent_alerts(limit).await,
        }
    }

    async fn insert_vehicle(
        &self,
        vehicle: NewVehicle,
        created_at: DateTime<Utc>,
    ) -> Result<Vehicle, DbError> {
        match self {
            Self::Postgres(s) => s.insert_vehicle(vehicle, created_at).await,
            Self::Memory(s) => s.insert_vehicle(vehicle, created_at).await,
        }
    }

    async fn insert_geofence(&self, geofence: NewGeofence) -> Result<Geofence, DbError> {
        match self {
            Self::Postgres(s) => s.insert_geofence(geofence).await,
            Self::Memory(s) => s.insert_geofence(geofence).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Postgres(s) => s.close().await,
            Self::Memory(s) => s.close().await,
        }
    }
}
