//! Geographic math for market resolution.
//!
//! Provides the great-circle distance used for every radius decision, the
//! bounding box used by the prefilter, and the circle polygon drawn as the
//! radius boundary on the map.
//!
//! All distances are statute miles on a spherical Earth of radius
//! [`EARTH_RADIUS_MILES`]. Changing the constant changes which organizations
//! fall inside a radius, so it must stay fixed.

mod types;

pub use types::{BoundingBox, CoordError, Coordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

use std::f64::consts::PI;

/// Earth's mean radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Number of vertices used for the radius boundary polygon.
pub const DEFAULT_POLYGON_POINTS: usize = 64;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Radians to degrees conversion factor.
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Great-circle distance between two coordinates in miles (haversine).
///
/// # Example
///
/// ```
/// use marketlens::coord::{distance_miles, Coordinate};
///
/// let a = Coordinate::new(0.0, 0.0).unwrap();
/// let b = Coordinate::new(1.0, 0.0).unwrap();
/// assert!((distance_miles(&a, &b) - 69.09).abs() < 0.1);
/// ```
#[inline]
pub fn distance_miles(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1_rad = a.latitude * DEG_TO_RAD;
    let lat2_rad = b.latitude * DEG_TO_RAD;
    let delta_lat = (b.latitude - a.latitude) * DEG_TO_RAD;
    let delta_lon = (b.longitude - a.longitude) * DEG_TO_RAD;

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_MILES * c
}

/// Projects a position along a bearing for a given distance.
///
/// # Arguments
///
/// * `start` - Starting position
/// * `bearing_deg` - True bearing in degrees (0 = north, 90 = east)
/// * `distance` - Distance in miles
pub fn project(start: &Coordinate, bearing_deg: f64, distance: f64) -> Coordinate {
    let lat1 = start.latitude * DEG_TO_RAD;
    let lon1 = start.longitude * DEG_TO_RAD;
    let bearing = bearing_deg * DEG_TO_RAD;
    let angular = distance / EARTH_RADIUS_MILES;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    let mut lon = lon2 * RAD_TO_DEG;
    if lon > MAX_LON {
        lon -= 360.0;
    } else if lon < MIN_LON {
        lon += 360.0;
    }

    Coordinate {
        latitude: (lat2 * RAD_TO_DEG).clamp(MIN_LAT, MAX_LAT),
        longitude: lon,
    }
}

/// Generates a closed ring approximating a circle of `radius` miles.
///
/// Returns `points + 1` coordinates; the first vertex is repeated at the end
/// so the ring is closed as GeoJSON requires.
pub fn circle_polygon(center: &Coordinate, radius: f64, points: usize) -> Vec<Coordinate> {
    let points = points.max(3);
    let step = 360.0 / points as f64;

    let mut ring: Vec<Coordinate> = (0..points)
        .map(|i| project(center, i as f64 * step, radius))
        .collect();
    ring.push(ring[0]);
    ring
}

#[cfg(test)]
mod tests;
