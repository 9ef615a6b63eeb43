use geo::Point;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A transient "what is near this point" request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityQuery {
    /// Query origin (x = longitude, y = latitude)
    pub point: Point<f64>,
    /// Distance cutoff in meters
    pub radius_meters: f64,
}

impl ProximityQuery {
    pub fn new(latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        Self {
            point: Point::new(longitude, latitude),
            radius_meters,
        }
    }

    pub fn from_point(point: Point<f64>, radius_meters: f64) -> Self {
        Self {
            point,
            radius_meters,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.point.y()
    }

    pub fn longitude(&self) -> f64 {
        self.point.x()
    }
}

/// A location fix pushed by the device's location service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub point: Point<f64>,
    pub timestamp: SystemTime,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: SystemTime) -> Self {
        Self {
            point: Point::new(longitude, latitude),
            timestamp,
        }
    }

    /// A sample stamped with the current wall-clock time.
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, SystemTime::now())
    }

    pub fn latitude(&self) -> f64 {
        self.point.y()
    }

    pub fn longitude(&self) -> f64 {
        self.point.x()
    }
}
