//! Time-windowed alert suppression keyed by (vehicle, geofence).
//!
//! The store is the only memory the deduplicator has: the decision is a
//! lookup for an alert on the same pair created strictly after
//! `now - window`. An alert created exactly `window` ago has expired and
//! no longer suppresses.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use geofleet_db::{DbError, EntityStore};
use geofleet_types::{AlertId, GeofenceId, VehicleId};

/// Outcome of a deduplication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitDecision {
    /// No alert for the pair inside the window; a new one may be created.
    Emit,
    /// An alert for the pair already exists inside the window.
    Suppressed {
        /// The alert that suppresses this one.
        existing: AlertId,
    },
}

impl EmitDecision {
    /// Whether the caller should go on to emit.
    pub const fn should_emit(self) -> bool {
        matches!(self, Self::Emit)
    }
}

/// Suppresses repeated alerts for the same pair inside a trailing window.
#[derive(Debug)]
pub struct AlertDeduplicator<S> {
    store: Arc<S>,
    window: TimeDelta,
}

impl<S: EntityStore> AlertDeduplicator<S> {
    /// Create a deduplicator with the given window.
    pub const fn new(store: Arc<S>, window: TimeDelta) -> Self {
        Self { store, window }
    }

    /// Decide whether an alert for `(vehicle_id, geofence_id)` at `now`
    /// should be emitted.
    ///
    /// # Errors
    ///
    /// Propagates store read failures.
    pub async fn check(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        now: DateTime<Utc>,
    ) -> Result<EmitDecision, DbError> {
        // A window reaching past the representable range covers all history.
        let since = now
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let recent = self
            .store
            .find_recent_alert(vehicle_id, geofence_id, since)
            .await?;
        Ok(recent.map_or(EmitDecision::Emit, |alert| EmitDecision::Suppressed {
            existing: alert.id,
        }))
    }

    /// Shorthand for [`check`](Self::check) reduced to a boolean.
    ///
    /// # Errors
    ///
    /// Propagates store read failures.
    pub async fn should_emit(
        &self,
        vehicle_id: VehicleId,
        geofence_id: GeofenceId,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        Ok(self.check(vehicle_id, geofence_id, now).await?.should_emit())
    }
}
