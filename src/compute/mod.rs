//! Compute layer for coordinate math and input decoding.
//!
//! This module keeps the pure functions apart from the stateful pieces
//! (store, index, cache, throttle). It provides:
//! - Haversine distance and degree/metre conversions
//! - Coordinate and query validation
//! - GeoJSON point-collection decoding and result encoding

pub mod distance;
pub mod geojson;
pub mod validation;

pub use distance::{EARTH_RADIUS_METERS, METERS_PER_DEGREE, haversine_distance};
