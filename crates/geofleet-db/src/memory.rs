//! In-memory [`EntityStore`] backend.
//!
//! Backs the test suites and serves as the runtime fallback when
//! `PostgreSQL` is unreachable and `store.fallback_to_memory` is set. A
//! single [`RwLock`] guards all three collections, so every trait call is
//! atomic with respect to every other call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geofleet_types::{
    Alert, AlertId, AlertView, Coordinate, Geofence, GeofenceId, NewAlert, NewGeofence,
    NewVehicle, Vehicle, VehicleId,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::EntityStore;

#[derive(Debug, Default)]
struct Collections {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    geofences: BTreeMap<GeofenceId, Geofence>,
    /// Insertion order.
    alerts: Vec<Alert>,
}

/// Entity store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of alerts ever inserted.
    pub async fn alert_count(&self) -> usize {
        self.inner.read().await.alerts.len()
    }
}

impl EntityStore for MemoryStore {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DbError> {
        let guard = self.inner.read().await;
        let mut vehicles: Vec<Vehicle> = guard.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(vehicles)
    }

    async fn update_vehicle_position(
        &self,
        id: VehicleId,
        position: Coordinate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        position.validate()?;
        let mut guard = self.inner.write().await;
        let vehicle = guard
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(format!("vehicle {id}")))?;
        vehicle.position = position;
        vehicle.updated_at = updated_at;
        Ok(())
    }

    async fn list_geofences(&self) -> Result<Vec<Geofence>, DbError> {
        let guard = self.inner.read().await;
        let mut geofences: Vec<Geofence> = guard.geofences.values().cloned().collect();
        geofences.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(geofences)
    }

    async fn find_recent_alert(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, DbError> {
        let guard = self.inner.read().await;
        let found = guard
            .alerts
            .iter()
            .filter(|a| {
                a.vehicle_id == vehicle_id && a.geofence_id == geofence_id && a.created_at > since
            })
            .max_by_key(|a| a.created_at)
            .cloned();
        Ok(found)
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, DbError> {
        let mut guard = self.inner.write().await;
        if !guard.vehicles.contains_key(&alert.vehicle_id) {
            return Err(DbError::NotFound(format!("vehicle {}", alert.vehicle_id)));
        }
        if !guard.geofences.contains_key(&alert.geofence_id) {
            return Err(DbError::NotFound(format!("geofence {}", alert.geofence_id)));
        }
        let stored = Alert {
            id: AlertId::new(),
            vehicle_id: alert.vehicle_id,
            geofence_id: alert.geofence_id,
            message: alert.message,
            created_at: alert.created_at,
        };
        guard.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertView>, DbError> {
        let guard = self.inner.read().await;
        let mut alerts: Vec<&Alert> = guard.alerts.iter().collect();
        // Stable sort keeps insertion order among equal timestamps; reverse
        // afterwards so the newest insert wins ties.
        alerts.sort_by_key(|a| a.created_at);
        let views = alerts
            .into_iter()
            .rev()
            .take(limit)
            .map(|a| AlertView {
                id: a.id,
                vehicle_id: a.vehicle_id,
                vehicle_label: guard
                    .vehicles
                    .get(&a.vehicle_id)
                    .map(|v| v.label.clone())
                    .unwrap_or_default(),
                geofence_id: a.geofence_id,
                geofence_name: guard
                    .geofences
                    .get(&a.geofence_id)
                    .map(|g| g.name.clone())
                    .unwrap_or_default(),
                message: a.message.clone(),
                created_at: a.created_at,
            })
            .collect();
        Ok(views)
    }

    async fn insert_vehicle(
        &self,
        vehicle: NewVehicle,
        created_at: DateTime<Utc>,
    ) -> Result<Vehicle, DbError> {
        vehicle.position.validate()?;
        let stored = Vehicle {
            id: VehicleId::new(),
            label: vehicle.label,
            position: vehicle.position,
            status: vehicle.status,
            updated_at: created_at,
        };
        self.inner
            .write()
            .await
            .vehicles
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_geofence(&self, geofence: NewGeofence) -> Result<Geofence, DbError> {
        geofence.validate()?;
        let stored = Geofence {
            id: GeofenceId::new(),
            name: geofence.name,
            center: geofence.center,
            radius_m: geofence.radius_m,
            alert_message: geofence.alert_message,
        };
        self.inner
            .write()
            .await
            .geofences
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn close(&self) {
        tracing::debug!("In-memory store closed");
    }
}
