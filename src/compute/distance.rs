//! Great-circle distance on a spherical Earth.
//!
//! Haversine error stays under 0.5% below 1 km, which is negligible at the
//! tens-of-metres scale used for obstacle lookups.

use geo::Point;

/// Spherical Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Length of one degree of latitude (or of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Haversine distance in meters between two lon/lat points.
///
/// # Examples
///
/// ```rust
/// use curbside::compute::distance::haversine_distance;
/// use geo::Point;
///
/// let ramp = Point::new(-122.4190, 37.7750);
/// let here = Point::new(-122.4194, 37.7749);
/// let d = haversine_distance(&here, &ramp);
/// assert!(d > 35.0 && d < 38.0);
/// ```
pub fn haversine_distance(a: &Point, b: &Point) -> f64 {
    let phi1 = a.y().to_radians();
    let phi2 = b.y().to_radians();
    let d_phi = (b.y() - a.y()).to_radians();
    let d_lambda = (b.x() - a.x()).to_radians();

    let sin_phi = (d_phi / 2.0).sin();
    let sin_lambda = (d_lambda / 2.0).sin();
    let h = (sin_phi * sin_phi + phi1.cos() * phi2.cos() * sin_lambda * sin_lambda).clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Degrees of latitude covered by `meters`.
pub fn meters_to_latitude_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Degrees of longitude covered by `meters` everywhere in the latitude band
/// within `meters` of `latitude`.
///
/// Returns `None` when the band touches a pole, where any longitude may be in
/// range.
pub fn meters_to_longitude_degrees(meters: f64, latitude: f64) -> Option<f64> {
    let lat_delta = meters_to_latitude_degrees(meters);
    let max_abs_lat = latitude.abs() + lat_delta;
    if max_abs_lat >= 90.0 {
        return None;
    }

    let cos = max_abs_lat.to_radians().cos();
    if cos <= f64::EPSILON {
        return None;
    }

    let degrees = lat_delta / cos;
    if degrees >= 180.0 { None } else { Some(degrees) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Distance, Haversine};

    #[test]
    fn test_zero_distance() {
        let p = Point::new(-74.0060, 40.7128);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_known_distance() {
        let here = Point::new(-122.4194, 37.7749);
        let ramp = Point::new(-122.4190, 37.7750);
        let d = haversine_distance(&here, &ramp);
        assert!((d - 36.9).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = Point::new(2.3522, 48.8566);
        let b = Point::new(-0.1278, 51.5074);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_agrees_with_geo_haversine() {
        let nyc = Point::new(-74.0060, 40.7128);
        let la = Point::new(-118.2437, 34.0522);
        let ours = haversine_distance(&nyc, &la);
        let theirs = Haversine.distance(nyc, la);
        // geo uses the 6,371,008.8 m mean radius
        assert!(((ours - theirs) / theirs).abs() < 1e-5);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = Point::new(10.0, 0.0);
        let b = Point::new(10.0, 1.0);
        assert!((haversine_distance(&a, &b) - METERS_PER_DEGREE).abs() < 1e-6);
    }

    #[test]
    fn test_across_antimeridian() {
        let east = Point::new(179.9999, 0.0);
        let west = Point::new(-179.9999, 0.0);
        assert!(haversine_distance(&east, &west) < 25.0);
    }

    #[test]
    fn test_longitude_degrees_widen_with_latitude() {
        let equator = meters_to_longitude_degrees(100.0, 0.0).unwrap();
        let north = meters_to_longitude_degrees(100.0, 60.0).unwrap();
        assert!(north > equator * 1.9);
        assert!(meters_to_longitude_degrees(100.0, 89.9999).is_none());
    }
}
