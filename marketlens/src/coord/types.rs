//! Coordinate type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Valid latitude range
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// A geographic position in decimal degrees.
///
/// Construct through [`Coordinate::new`] to have the ranges checked. Values
/// deserialized from a store are validated by the store adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Degrees north (-90 to 90)
    pub latitude: f64,
    /// Degrees east (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate, rejecting out-of-range or NaN values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Re-checks the range invariant on an already-built value.
    pub fn validate(&self) -> Result<(), CoordError> {
        Self::new(self.latitude, self.longitude).map(|_| ())
    }

    /// Bit-exact key for hashing (f64 is not `Hash`).
    pub(crate) fn bits(&self) -> (u64, u64) {
        (self.latitude.to_bits(), self.longitude.to_bits())
    }

    /// GeoJSON position order: `[longitude, latitude]`.
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// Axis-aligned latitude/longitude rectangle.
///
/// Used as an over-inclusive spatial query; exact distances are computed
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Builds a box extending `margin_degrees` in every direction from
    /// `center`, clamped to the valid coordinate ranges.
    pub fn around(center: &Coordinate, margin_degrees: f64) -> Self {
        let margin = margin_degrees.abs();
        Self {
            lat_min: (center.latitude - margin).max(MIN_LAT),
            lat_max: (center.latitude + margin).min(MAX_LAT),
            lon_min: (center.longitude - margin).max(MIN_LON),
            lon_max: (center.longitude + margin).min(MAX_LON),
        }
    }

    /// Returns true if the coordinate lies inside the box (edges inclusive).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coord.latitude)
            && (self.lon_min..=self.lon_max).contains(&coord.longitude)
    }
}

/// Errors that can occur when building coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),
}
