//! Validation for geographic coordinates and proximity queries.

use crate::error::{CurbsideError, Result};
use curbside_types::query::ProximityQuery;
use geo::Point;

/// Validates a point has finite, in-range longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use curbside::compute::validation::validate_geographic_point;
/// use geo::Point;
///
/// assert!(validate_geographic_point(&Point::new(-122.4194, 37.7749)).is_ok());
/// assert!(validate_geographic_point(&Point::new(200.0, 40.0)).is_err());
/// assert!(validate_geographic_point(&Point::new(-74.0, 95.0)).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(CurbsideError::InvalidQuery(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(CurbsideError::InvalidQuery(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(CurbsideError::InvalidQuery(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(CurbsideError::InvalidQuery(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Cheap check used while loading, where bad entries are skipped rather than reported.
pub fn is_valid_coordinate(longitude: f64, latitude: f64) -> bool {
    longitude.is_finite()
        && latitude.is_finite()
        && (-180.0..=180.0).contains(&longitude)
        && (-90.0..=90.0).contains(&latitude)
}

/// Validates the origin and radius of a proximity query.
///
/// # Examples
///
/// ```
/// use curbside::compute::validation::validate_query;
/// use curbside_types::query::ProximityQuery;
///
/// assert!(validate_query(&ProximityQuery::new(37.7749, -122.4194, 20.0)).is_ok());
/// assert!(validate_query(&ProximityQuery::new(37.7749, -122.4194, 0.0)).is_err());
/// ```
pub fn validate_query(query: &ProximityQuery) -> Result<()> {
    let radius = query.radius_meters;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(CurbsideError::InvalidQuery(format!(
            "Radius must be finite and positive, got: {}",
            radius
        )));
    }

    validate_geographic_point(&query.point)
}
