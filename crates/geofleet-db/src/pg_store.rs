//! `PostgreSQL`-backed [`EntityStore`].
//!
//! Each trait call is a single statement, so position updates and alert
//! inserts are atomic without explicit transactions. Geometry is checked
//! before the statement is sent; the table `CHECK` constraints are the
//! second line.

use chrono::{DateTime, Utc};
use geofleet_types::{
    Alert, AlertId, AlertView, Coordinate, Geofence, GeofenceId, NewAlert, NewGeofence,
    NewVehicle, Vehicle, VehicleId, VehicleStatus,
};
use uuid::Uuid;

use crate::error::DbError;
use crate::postgres::PostgresPool;
use crate::store::EntityStore;

/// Entity store backed by a [`PostgresPool`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PostgresPool,
}

impl PostgresStore {
    /// Wrap an already-connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl EntityStore for PostgresStore {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DbError> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            r"SELECT id, label, lat, lng, status, updated_at
              FROM vehicles
              ORDER BY label, id",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(mappable_vehicles(rows))
    }

    async fn update_vehicle_position(
        &self,
        id: VehicleId,
        position: Coordinate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        position.validate()?;

        let result = sqlx::query(
            r"UPDATE vehicles SET lat = $2, lng = $3, updated_at = $4
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .bind(position.lat)
        .bind(position.lng)
        .bind(updated_at)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("vehicle {id}")));
        }
        Ok(())
    }

    async fn list_geofences(&self) -> Result<Vec<Geofence>, DbError> {
        let rows = sqlx::query_as::<_, GeofenceRow>(
            r"SELECT id, name, center_lat, center_lng, radius_m, alert_message
              FROM geofences
              ORDER BY name, id",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(GeofenceRow::into_geofence).collect())
    }

    async fn find_recent_alert(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, DbError> {
        let row = sqlx::query_as::<_, AlertRow>(
            r"SELECT id, vehicle_id, geofence_id, message, created_at
              FROM alerts
              WHERE vehicle_id = $1 AND geofence_id = $2 AND created_at > $3
              ORDER BY created_at DESC
              LIMIT 1",
        )
        .bind(vehicle_id.into_inner())
        .bind(geofence_id.into_inner())
        .bind(since)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(AlertRow::into_alert))
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, DbError> {
        let id = AlertId::new();
        sqlx::query(
            r"INSERT INTO alerts (id, vehicle_id, geofence_id, message, created_at)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id.into_inner())
        .bind(alert.vehicle_id.into_inner())
        .bind(alert.geofence_id.into_inner())
        .bind(&alert.message)
        .bind(alert.created_at)
        .execute(self.pool.pool())
        .await?;

        Ok(Alert {
            id,
            vehicle_id: alert.vehicle_id,
            geofence_id: alert.geofence_id,
            message: alert.message,
            created_at: alert.created_at,
        })
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertView>, DbError> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, AlertViewRow>(
            r"SELECT a.id, a.vehicle_id, v.label AS vehicle_label,
                     a.geofence_id, g.name AS geofence_name,
                     a.message, a.created_at
              FROM alerts a
              JOIN vehicles v ON v.id = a.vehicle_id
              JOIN geofences g ON g.id = a.geofence_id
              ORDER BY a.created_at DESC, a.id DESC
              LIMIT $1",
        )
        .bind(limit_i64)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(AlertViewRow::into_view).collect())
    }

    async fn insert_vehicle(
        &self,
        vehicle: NewVehicle,
        created_at: DateTime<Utc>,
    ) -> Result<Vehicle, DbError> {
        vehicle.position.validate()?;
        let id = VehicleId::new();
        sqlx::query(
            r"INSERT INTO vehicles (id, label, lat, lng, status, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id.into_inner())
        .bind(&vehicle.label)
        .bind(vehicle.position.lat)
        .bind(vehicle.position.lng)
        .bind(vehicle.status.as_str())
        .bind(created_at)
        .execute(self.pool.pool())
        .await?;

        Ok(Vehicle {
            id,
            label: vehicle.label,
            position: vehicle.position,
            status: vehicle.status,
            updated_at: created_at,
        })
    }

    async fn insert_geofence(&self, geofence: NewGeofence) -> Result<Geofence, DbError> {
        geofence.validate()?;
        let id = GeofenceId::new();
        sqlx::query(
            r"INSERT INTO geofences (id, name, center_lat, center_lng, radius_m, alert_message)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id.into_inner())
        .bind(&geofence.name)
        .bind(geofence.center.lat)
        .bind(geofence.center.lng)
        .bind(geofence.radius_m)
        .bind(&geofence.alert_message)
        .execute(self.pool.pool())
        .await?;

        Ok(Geofence {
            id,
            name: geofence.name,
            center: geofence.center,
            radius_m: geofence.radius_m,
            alert_message: geofence.alert_message,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map vehicle rows, dropping any row that no longer maps onto a
/// [`Vehicle`] so one bad record cannot stall every tick.
fn mappable_vehicles(rows: Vec<VehicleRow>) -> Vec<Vehicle> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match row.into_vehicle() {
                Ok(vehicle) => Some(vehicle),
                Err(e) => {
                    tracing::warn!(vehicle_id = %id, error = %e, "Skipping unreadable vehicle row");
                    None
                }
            }
        })
        .collect()
}

// =========================================================================
// Row types
// =========================================================================

/// A row from the `vehicles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    label: String,
    lat: f64,
    lng: f64,
    status: String,
    updated_at: DateTime<Utc>,
}

impl VehicleRow {
    fn into_vehicle(self) -> Result<Vehicle, DbError> {
        let status: VehicleStatus = self.status.parse().map_err(DbError::CorruptRow)?;
        Ok(Vehicle {
            id: VehicleId::from(self.id),
            label: self.label,
            position: Coordinate::unchecked(self.lat, self.lng),
            status,
            updated_at: self.updated_at,
        })
    }
}

/// A row from the `geofences` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct GeofenceRow {
    id: Uuid,
    name: String,
    center_lat: f64,
    center_lng: f64,
    radius_m: f64,
    alert_message: String,
}

impl GeofenceRow {
    fn into_geofence(self) -> Geofence {
        Geofence {
            id: GeofenceId::from(self.id),
            name: self.name,
            center: Coordinate::unchecked(self.center_lat, self.center_lng),
            radius_m: self.radius_m,
            alert_message: self.alert_message,
        }
    }
}

/// A row from the `alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    vehicle_id: Uuid,
    geofence_id: Uuid,
    message: String,
    created_at: DateTime<Utc>,
}

impl AlertRow {
    fn into_alert(self) -> Alert {
        Alert {
            id: AlertId::from(self.id),
            vehicle_id: VehicleId::from(self.vehicle_id),
            geofence_id: GeofenceId::from(self.geofence_id),
            message: self.message,
            created_at: self.created_at,
        }
    }
}

/// An `alerts` row joined with `vehicles.label` and `geofences.name`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AlertViewRow {
    id: Uuid,
    vehicle_id: Uuid,
    vehicle_label: String,
    geofence_id: Uuid,
    geofence_name: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl AlertViewRow {
    fn into_view(self) -> AlertView {
        AlertView {
            id: AlertId::from(self.id),
            vehicle_id: VehicleId::from(self.vehicle_id),
            vehicle_label: self.vehicle_label,
            geofence_id: GeofenceId::from(self.geofence_id),
            geofence_name: self.geofence_name,
            message: self.message,
            created_at: self.created_at,
        }
    }
}
