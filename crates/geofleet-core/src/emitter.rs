//! Persists qualifying geofence entries as alerts.
//!
//! The creation timestamp is read from the [`Clock`] at the moment of
//! persistence. Readers see an alert only once it has been inserted; there
//! is no push channel.

use std::sync::Arc;

use geofleet_db::{DbError, EntityStore};
use geofleet_types::{AlertId, NewAlert, Vehicle};

use crate::clock::Clock;
use crate::geofence::GeofenceMatch;

/// Writes alerts through the entity store and logs them.
#[derive(Debug)]
pub struct AlertEmitter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: EntityStore> AlertEmitter<S> {
    /// Create an emitter over `store`, timestamping with `clock`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist an alert for `vehicle` entering `hit.geofence` and return
    /// its identifier.
    ///
    /// The alert carries the geofence's configured message.
    ///
    /// # Errors
    ///
    /// Propagates the store insert failure; nothing is logged as emitted
    /// in that case.
    pub async fn emit(&self, vehicle: &Vehicle, hit: &GeofenceMatch<'_>) -> Result<AlertId, DbError> {
        let geofence = hit.geofence;
        let alert = self
            .store
            .insert_alert(NewAlert {
                vehicle_id: vehicle.id,
                geofence_id: geofence.id,
                message: geofence.alert_message.clone(),
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(
            alert_id = %alert.id,
            vehicle_id = %vehicle.id,
            vehicle = %vehicle.label,
            geofence = %geofence.name,
            distance_m = format_args!("{:.0}", hit.distance_m),
            "{} entered {} ({:.0} m from center): {}",
            vehicle.label,
            geofence.name,
            hit.distance_m,
            alert.message,
        );
        Ok(alert.id)
    }
}
