//! Geofence matching: great-circle distance and radius containment.
//!
//! Everything here is pure. Matches are recomputed from current state on
//! every tick; [`match_all`] returns a cloneable iterator so a caller can
//! walk the same matches twice without hidden state carried between calls.

use geofleet_types::{Coordinate, Geofence, Vehicle};

/// Mean Earth radius in meters used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (haversine).
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Whether `position` lies within `geofence` (boundary inclusive).
pub fn is_contained(position: Coordinate, geofence: &Geofence) -> bool {
    distance_m(position, geofence.center) <= geofence.radius_m
}

/// A geofence that currently contains a vehicle.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceMatch<'a> {
    /// The containing geofence.
    pub geofence: &'a Geofence,
    /// Distance from the vehicle to the geofence center in meters.
    pub distance_m: f64,
}

/// The geofences that contain `vehicle`'s current position, in the order
/// they appear in `geofences`.
pub fn match_all<'a>(
    vehicle: &Vehicle,
    geofences: &'a [Geofence],
) -> impl Iterator<Item = GeofenceMatch<'a>> + Clone + 'a {
    let position = vehicle.position;
    geofences.iter().filter_map(move |geofence| {
        let distance_m = distance_m(position, geofence.center);
        (distance_m <= geofence.radius_m).then_some(GeofenceMatch {
            geofence,
            distance_m,
        })
    })
}
