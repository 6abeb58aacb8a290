//! Bootstrap seeding of an empty store from the `fleet` config section.
//!
//! Seeding only runs when the store holds no vehicles and no geofences, so
//! restarting against a populated database never duplicates the fleet.
//! Entries with invalid geometry are rejected by the store and skipped.

use chrono::{DateTime, Utc};
use geofleet_db::{DbError, EntityStore};
use tracing::{info, warn};

use crate::config::FleetConfig;

/// What a seeding pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// False when the store already held data and seeding was skipped.
    pub seeded: bool,
    /// Vehicles inserted.
    pub vehicles_inserted: u32,
    /// Geofences inserted.
    pub geofences_inserted: u32,
    /// Entries rejected for invalid geometry.
    pub rejected: u32,
}

/// Insert `fleet` into `store` if the store is empty.
///
/// # Errors
///
/// Returns the first store error other than [`DbError::InvalidGeometry`].
pub async fn seed_if_empty<S: EntityStore>(
    store: &S,
    fleet: &FleetConfig,
    default_radius_m: f64,
    now: DateTime<Utc>,
) -> Result<SeedReport, DbError> {
    let existing_vehicles = store.list_vehicles().await?.len();
    let existing_geofences = store.list_geofences().await?.len();
    if existing_vehicles > 0 || existing_geofences > 0 {
        info!(
            vehicles = existing_vehicles,
            geofences = existing_geofences,
            "Store already populated, skipping seed"
        );
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport {
        seeded: true,
        ..SeedReport::default()
    };

    for entry in &fleet.vehicles {
        match store.insert_vehicle(entry.to_new_vehicle(), now).await {
            Ok(vehicle) => {
                report.vehicles_inserted = report.vehicles_inserted.saturating_add(1);
                info!(vehicle_id = %vehicle.id, vehicle = %vehicle.label, position = %vehicle.position, "Seeded vehicle");
            }
            Err(DbError::InvalidGeometry(e)) => {
                report.rejected = report.rejected.saturating_add(1);
                warn!(vehicle = %entry.label, error = %e, "Skipping vehicle with invalid position");
            }
            Err(e) => return Err(e),
        }
    }

    for entry in &fleet.geofences {
        match store
            .insert_geofence(entry.to_new_geofence(default_radius_m))
            .await
        {
            Ok(geofence) => {
                report.geofences_inserted = report.geofences_inserted.saturating_add(1);
                info!(
                    geofence_id = %geofence.id,
                    geofence = %geofence.name,
                    radius_m = geofence.radius_m,
                    "Seeded geofence"
                );
            }
            Err(DbError::InvalidGeometry(e)) => {
                report.rejected = report.rejected.saturating_add(1);
                warn!(geofence = %entry.name, error = %e, "Skipping geofence with invalid geometry");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}
