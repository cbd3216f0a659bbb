//! Tests for distance and geometry helpers

use super::*;

fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

#[test]
fn test_distance_to_self_is_zero() {
    let st_louis = coord(38.6592, -90.358);
    assert_eq!(distance_miles(&st_louis, &st_louis), 0.0);
}

#[test]
fn test_distance_is_symmetric() {
    let pairs = [
        (coord(38.6592, -90.358), coord(41.8781, -87.6298)),
        (coord(-33.8688, 151.2093), coord(51.5074, -0.1278)),
        (coord(0.0, 179.9), coord(0.0, -179.9)),
    ];

    for (a, b) in pairs {
        let ab = distance_miles(&a, &b);
        let ba = distance_miles(&b, &a);
        assert!((ab - ba).abs() < 1e-9, "{} vs {} differ", ab, ba);
    }
}

#[test]
fn test_known_city_distance() {
    // St. Louis to Chicago is roughly 262 miles great-circle
    let st_louis = coord(38.6270, -90.1994);
    let chicago = coord(41.8781, -87.6298);

    let distance = distance_miles(&st_louis, &chicago);
    assert!(
        (distance - 262.0).abs() < 262.0 * 0.015,
        "St. Louis to Chicago should be ~262 miles, got {}",
        distance
    );
}

#[test]
fn test_distance_across_antimeridian_is_short() {
    let west = coord(0.0, 179.9);
    let east = coord(0.0, -179.9);
    assert!(distance_miles(&west, &east) < 14.0);
}

#[test]
fn test_antipodal_distance_is_half_circumference() {
    let a = coord(0.0, 0.0);
    let b = coord(0.0, 180.0);
    let half = std::f64::consts::PI * EARTH_RADIUS_MILES;
    assert!((distance_miles(&a, &b) - half).abs() < 1e-6);
}

#[test]
fn test_coordinate_rejects_out_of_range() {
    assert!(matches!(
        Coordinate::new(90.5, 0.0),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(matches!(
        Coordinate::new(0.0, -180.5),
        Err(CoordError::InvalidLongitude(_))
    ));
    assert!(matches!(
        Coordinate::new(f64::NAN, 0.0),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(Coordinate::new(-90.0, 180.0).is_ok());
}

#[test]
fn test_coord_error_display() {
    let err = CoordError::InvalidLatitude(91.0);
    assert!(err.to_string().contains("91"));
    assert!(err.to_string().contains("-90"));
}

#[test]
fn test_bounding_box_around_center() {
    let center = coord(38.6592, -90.358);
    let bbox = BoundingBox::around(&center, 2.0);

    assert!((bbox.lat_min - 36.6592).abs() < 1e-9);
    assert!((bbox.lat_max - 40.6592).abs() < 1e-9);
    assert!((bbox.lon_min - -92.358).abs() < 1e-9);
    assert!((bbox.lon_max - -88.358).abs() < 1e-9);
    assert!(bbox.contains(&center));
    assert!(!bbox.contains(&coord(41.0, -90.358)));
}

#[test]
fn test_bounding_box_clamps_to_valid_range() {
    let bbox = BoundingBox::around(&coord(89.5, 179.0), 2.0);
    assert_eq!(bbox.lat_max, MAX_LAT);
    assert_eq!(bbox.lon_max, MAX_LON);
}

#[test]
fn test_project_lands_at_requested_distance() {
    let center = coord(38.6592, -90.358);

    for (bearing, miles) in [(0.0, 2.0), (90.0, 5.0), (200.0, 9.0), (315.0, 42.0)] {
        let target = project(&center, bearing, miles);
        let measured = distance_miles(&center, &target);
        assert!(
            (measured - miles).abs() < 1e-6,
            "bearing {}: expected {} got {}",
            bearing,
            miles,
            measured
        );
    }
}

#[test]
fn test_project_north_increases_latitude() {
    let start = coord(0.0, 0.0);
    let north = project(&start, 0.0, 69.09);
    assert!((north.latitude - 1.0).abs() < 0.01);
    assert!(north.longitude.abs() < 1e-9);
}

#[test]
fn test_circle_polygon_is_closed_ring() {
    let center = coord(38.6592, -90.358);
    let ring = circle_polygon(&center, 10.0, DEFAULT_POLYGON_POINTS);

    assert_eq!(ring.len(), DEFAULT_POLYGON_POINTS + 1);
    assert_eq!(ring.first(), ring.last());
    for vertex in &ring {
        assert!((distance_miles(&center, vertex) - 10.0).abs() < 1e-6);
    }
}

#[test]
fn test_circle_polygon_minimum_vertices() {
    let ring = circle_polygon(&coord(0.0, 0.0), 1.0, 1);
    assert_eq!(ring.len(), 4);
}
