//! Fault-injecting store wrapper for the core test suites.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use geofleet_db::{DbError, EntityStore, MemoryStore};
use geofleet_types::{
    Alert, AlertView, Coordinate, Geofence, GeofenceId, NewAlert, NewGeofence, NewVehicle,
    Vehicle, VehicleId,
};

/// Wraps a [`MemoryStore`] and fails or slows selected calls on demand.
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    fail_next: Mutex<HashSet<VehicleId>>,
    failing_inserts: Mutex<HashSet<GeofenceId>>,
    failing_lookups: Mutex<HashSet<GeofenceId>>,
    extra_geofences: Mutex<Vec<Geofence>>,
    unavailable: AtomicBool,
    update_delay: Option<Duration>,
    updates_completed: AtomicU32,
}

impl FailingStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Every position write sleeps for `delay` on the Tokio clock first.
    pub(crate) fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    /// The next position write for `id` fails as if the connection dropped.
    pub(crate) fn fail_next_update(&self, id: VehicleId) {
        self.fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    /// Every alert insert for `geofence` fails until the test ends.
    pub(crate) fn fail_alert_inserts(&self, geofence: GeofenceId) {
        self.failing_inserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(geofence);
    }

    /// Every dedup lookup for `geofence` fails until the test ends.
    pub(crate) fn fail_alert_lookups(&self, geofence: GeofenceId) {
        self.failing_lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(geofence);
    }

    /// Append `geofence` to every snapshot without validating it, standing
    /// in for a row written behind the store's back.
    pub(crate) fn plant_geofence(&self, geofence: Geofence) {
        self.extra_geofences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(geofence);
    }

    /// While set, snapshot reads fail with [`DbError::Unavailable`].
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Position writes that reached the inner store.
    pub(crate) fn updates_completed(&self) -> u32 {
        self.updates_completed.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DbError::Unavailable(String::from("injected outage")))
        } else {
            Ok(())
        }
    }
}

impl EntityStore for FailingStore {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DbError> {
        self.check_available()?;
        self.inner.list_vehicles().await
    }

    async fn update_vehicle_position(
        &self,
        id: VehicleId,
        position: Coordinate,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if injected {
            return Err(DbError::Unavailable(format!("injected write failure for {id}")));
        }
        self.inner
            .update_vehicle_position(id, position, updated_at)
            .await?;
        self.updates_completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_geofences(&self) -> Result<Vec<Geofence>, DbError> {
        self.check_available()?;
        let mut geofences = self.inner.list_geofences().await?;
        geofences.extend(
            self.extra_geofences
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .cloned(),
        );
        Ok(geofences)
    }

    async fn find_recent_alert(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>, DbError> {
        let injected = self
            .failing_lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&geofence_id);
        if injected {
            return Err(DbError::Unavailable(format!("injected lookup failure for {geofence_id}")));
        }
        self.inner
            .find_recent_alert(vehicle_id, geofence_id, since)
            .await
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, DbError> {
        let injected = self
            .failing_inserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&alert.geofence_id);
        if injected {
            return Err(DbError::Unavailable(format!(
                "injected insert failure for {}",
                alert.geofence_id
            )));
        }
        self.inner.insert_alert(alert).await
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertView>, DbError> {
        self.inner.recent_alerts(limit).await
    }

    async fn insert_vehicle(
        &self,
        vehicle: NewVehicle,
        created_at: DateTime<Utc>,
    ) -> Result<Vehicle, DbError> {
        self.inner.insert_vehicle(vehicle, created_at).await
    }

    async fn insert_geofence(&self, geofence: NewGeofence) -> Result<Geofence, DbError> {
        self.inner.insert_geofence(geofence).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
