//! Geographic primitives and geometry validation.
//!
//! A [`Coordinate`] is a WGS-84 latitude/longitude pair in degrees. The
//! validation helpers here are the single definition of "valid geometry"
//! shared by the store (which rejects invalid writes) and the simulator
//! (which skips invalid records).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Smallest valid latitude in degrees.
pub const MIN_LATITUDE: f64 = -90.0;

/// Largest valid latitude in degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Smallest valid longitude in degrees.
pub const MIN_LONGITUDE: f64 = -180.0;

/// Largest valid longitude in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A record failed geometric validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Latitude is outside `[-90, 90]` or not a finite number.
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange {
        /// The rejected latitude.
        value: f64,
    },

    /// Longitude is outside `[-180, 180]` or not a finite number.
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange {
        /// The rejected longitude.
        value: f64,
    },

    /// Geofence radius is zero, negative, or not a finite number.
    #[error("geofence radius {value} m must be a positive finite number")]
    NonPositiveRadius {
        /// The rejected radius in meters.
        value: f64,
    },
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::LatitudeOutOfRange`] or
    /// [`GeometryError::LongitudeOutOfRange`] for invalid input.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeometryError> {
        let coord = Self { lat, lng };
        coord.validate()?;
        Ok(coord)
    }

    /// Build a coordinate without range checks.
    ///
    /// Used for intermediate positions (such as a random-walk proposal)
    /// that are validated later at the store boundary.
    pub const fn unchecked(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check both components against their valid ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range component as a [`GeometryError`].
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.lat.is_finite() || !(MIN_LATITUDE..=MAX_LATITUDE).contains(&self.lat) {
            return Err(GeometryError::LatitudeOutOfRange { value: self.lat });
        }
        if !self.lng.is_finite() || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.lng) {
            return Err(GeometryError::LongitudeOutOfRange { value: self.lng });
        }
        Ok(())
    }

    /// Whether both components are within their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Check that a geofence radius is a positive finite number of meters.
///
/// # Errors
///
/// Returns [`GeometryError::NonPositiveRadius`] otherwise.
pub fn validate_radius(radius_m: f64) -> Result<(), GeometryError> {
    if radius_m.is_finite() && radius_m > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::NonPositiveRadius { value: radius_m })
    }
}
