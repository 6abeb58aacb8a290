//! Core entity records: vehicles, geofences, and alerts.
//!
//! Vehicles are the only mutable entity (their position changes every
//! tick). Geofences are static reference data and alerts are insert-only.
//! The `New*` structs are the insert payloads accepted by the store; the
//! store assigns identifiers and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::{validate_radius, Coordinate, GeometryError};
use crate::ids::{AlertId, GeofenceId, VehicleId};

/// Operational status tag of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum VehicleStatus {
    /// On the road and being tracked.
    Active,
    /// Parked or waiting for an assignment.
    Idle,
    /// Out of service.
    Maintenance,
}

impl VehicleStatus {
    /// Database / wire representation of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Maintenance => "maintenance",
        }
    }
}

impl core::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("unknown vehicle status: {other}")),
        }
    }
}

/// A tracked vehicle with its most recently committed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vehicle {
    /// Vehicle identifier.
    pub id: VehicleId,
    /// Human-readable label (plate, call sign).
    pub label: String,
    /// Current position.
    pub position: Coordinate,
    /// Status tag.
    pub status: VehicleStatus,
    /// When the position was last written.
    pub updated_at: DateTime<Utc>,
}

/// A static circular zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Geofence {
    /// Geofence identifier.
    pub id: GeofenceId,
    /// Display name.
    pub name: String,
    /// Center of the zone.
    pub center: Coordinate,
    /// Radius in meters, always positive.
    pub radius_m: f64,
    /// Message attached to every alert raised for this zone.
    pub alert_message: String,
}

impl Geofence {
    /// Check the center and radius.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] for an out-of-range center or a
    /// non-positive radius.
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.center.validate()?;
        validate_radius(self.radius_m)
    }
}

/// An immutable record of a vehicle found inside a geofence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Alert {
    /// Alert identifier.
    pub id: AlertId,
    /// Vehicle that entered the zone.
    pub vehicle_id: VehicleId,
    /// Zone that was entered.
    pub geofence_id: GeofenceId,
    /// Copy of the geofence's alert message at emission time.
    pub message: String,
    /// Wall-clock time the alert was persisted.
    pub created_at: DateTime<Utc>,
}

/// An alert joined with the vehicle label and geofence name for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AlertView {
    /// Alert identifier.
    pub id: AlertId,
    /// Vehicle that entered the zone.
    pub vehicle_id: VehicleId,
    /// Label of that vehicle.
    pub vehicle_label: String,
    /// Zone that was entered.
    pub geofence_id: GeofenceId,
    /// Name of that zone.
    pub geofence_name: String,
    /// Alert message.
    pub message: String,
    /// Wall-clock time the alert was persisted.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    /// Human-readable label.
    pub label: String,
    /// Initial position.
    pub position: Coordinate,
    /// Initial status.
    pub status: VehicleStatus,
}

/// Insert payload for a geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGeofence {
    /// Display name.
    pub name: String,
    /// Center of the zone.
    pub center: Coordinate,
    /// Radius in meters.
    pub radius_m: f64,
    /// Message attached to alerts for this zone.
    pub alert_message: String,
}

impl NewGeofence {
    /// Check the center and radius before insertion.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] for invalid geometry.
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.center.validate()?;
        validate_radius(self.radius_m)
    }
}

/// Insert payload for an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlert {
    /// Vehicle that entered the zone.
    pub vehicle_id: VehicleId,
    /// Zone that was entered.
    pub geofence_id: GeofenceId,
    /// Alert message.
    pub message: String,
    /// Authoritative creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [VehicleStatus::Active, VehicleStatus::Idle, VehicleStatus::Maintenance] {
            assert_eq!(status.as_str().parse::<VehicleStatus>(), Ok(status));
        }
        assert!("parked".parse::<VehicleStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&VehicleStatus::Maintenance).ok();
        assert_eq!(json.as_deref(), Some("\"maintenance\""));
    }

    #[test]
    fn geofence_validation_checks_radius_and_center() {
        let mut fence = NewGeofence {
            name: String::from("Depot"),
            center: Coordinate::unchecked(41.8781, -87.6298),
            radius_m: 8000.0,
            alert_message: String::from("Vehicle arrived at depot"),
        };
        assert!(fence.validate().is_ok());

        fence.radius_m = 0.0;
        assert!(matches!(
            fence.validate(),
            Err(GeometryError::NonPositiveRadius { .. })
        ));

        fence.radius_m = 100.0;
        fence.center = Coordinate::unchecked(-91.0, 0.0);
        assert!(matches!(
            fence.validate(),
            Err(GeometryError::LatitudeOutOfRange { .. })
        ));
    }
}
