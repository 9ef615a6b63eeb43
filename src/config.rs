//! Configuration for proximity sessions.
//!
//! Every field has a default tuned for a walking-speed trip recorder: 20 m
//! search radius, a ~100 m grid cell, at most 50 results, one engine query per
//! second and a ten-entry result cache.
use crate::error::{CurbsideError, Result};
use serde::de::Error;
use std::time::Duration;

/// Proximity session configuration
///
/// # Example
///
/// ```rust
/// use curbside::Config;
///
/// let config = Config::from_json(r#"{ "max_results": 25, "cache_capacity": 4 }"#).unwrap();
/// assert_eq!(config.max_results, 25);
/// assert_eq!(config.default_radius_meters, 20.0);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Grid cell edge in degrees
    #[serde(default = "Config::default_cell_size_degrees")]
    pub cell_size_degrees: f64,

    /// Radius used for location updates
    #[serde(default = "Config::default_radius_meters")]
    pub default_radius_meters: f64,

    /// Hard cap on results returned per query
    #[serde(default = "Config::default_max_results")]
    pub max_results: usize,

    /// Features beyond this many are dropped at load time
    #[serde(default = "Config::default_max_features")]
    pub max_features: usize,

    #[serde(default = "Config::default_cache_capacity")]
    pub cache_capacity: usize,

    /// Decimal places used to round cache keys
    #[serde(default = "Config::default_cache_precision")]
    pub cache_precision: u32,

    /// Drift beyond which a cached result is discarded
    #[serde(default = "Config::default_cache_invalidation_meters")]
    pub cache_invalidation_meters: f64,

    /// Minimum interval between admitted engine queries
    #[serde(default = "Config::default_throttle_interval_ms")]
    pub throttle_interval_ms: u64,

    /// Queries slower than this are logged
    #[serde(default = "Config::default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

impl Config {
    const fn default_cell_size_degrees() -> f64 {
        0.001
    }

    const fn default_radius_meters() -> f64 {
        20.0
    }

    const fn default_max_results() -> usize {
        50
    }

    const fn default_max_features() -> usize {
        100_000
    }

    const fn default_cache_capacity() -> usize {
        10
    }

    const fn default_cache_precision() -> u32 {
        3
    }

    const fn default_cache_invalidation_meters() -> f64 {
        10.0
    }

    const fn default_throttle_interval_ms() -> u64 {
        1000
    }

    const fn default_slow_query_threshold_ms() -> u64 {
        100
    }

    pub fn with_cell_size_degrees(mut self, cell_size: f64) -> Self {
        self.cell_size_degrees = cell_size;
        self
    }

    pub fn with_default_radius(mut self, radius_meters: f64) -> Self {
        self.default_radius_meters = radius_meters;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        if max_features > 1_000_000 {
            log::warn!(
                "Feature ceiling of {} is very large and may exhaust memory on a mobile device",
                max_features
            );
        }
        self.max_features = max_features;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_cache_precision(mut self, precision: u32) -> Self {
        self.cache_precision = precision;
        self
    }

    pub fn with_cache_invalidation_meters(mut self, meters: f64) -> Self {
        self.cache_invalidation_meters = meters;
        self
    }

    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold_ms = threshold.as_millis() as u64;
        self
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cell_size_degrees.is_finite() || self.cell_size_degrees <= 0.0 {
            return Err(CurbsideError::InvalidConfig(format!(
                "cell_size_degrees must be finite and positive, got: {}",
                self.cell_size_degrees
            )));
        }

        if !self.default_radius_meters.is_finite() || self.default_radius_meters <= 0.0 {
            return Err(CurbsideError::InvalidConfig(format!(
                "default_radius_meters must be finite and positive, got: {}",
                self.default_radius_meters
            )));
        }

        if !self.cache_invalidation_meters.is_finite() || self.cache_invalidation_meters < 0.0 {
            return Err(CurbsideError::InvalidConfig(format!(
                "cache_invalidation_meters must be finite and non-negative, got: {}",
                self.cache_invalidation_meters
            )));
        }

        if self.max_results == 0 {
            return Err(CurbsideError::InvalidConfig(
                "max_results must be greater than zero".to_string(),
            ));
        }

        if self.max_features == 0 {
            return Err(CurbsideError::InvalidConfig(
                "max_features must be greater than zero".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(CurbsideError::InvalidConfig(
                "cache_capacity must be greater than zero".to_string(),
            ));
        }

        if self.cache_precision > 9 {
            return Err(CurbsideError::InvalidConfig(format!(
                "cache_precision must be at most 9 decimal places, got: {}",
                self.cache_precision
            )));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell_size_degrees: Self::default_cell_size_degrees(),
            default_radius_meters: Self::default_radius_meters(),
            max_results: Self::default_max_results(),
            max_features: Self::default_max_features(),
            cache_capacity: Self::default_cache_capacity(),
            cache_precision: Self::default_cache_precision(),
            cache_invalidation_meters: Self::default_cache_invalidation_meters(),
            throttle_interval_ms: Self::default_throttle_interval_ms(),
            slow_query_threshold_ms: Self::default_slow_query_threshold_ms(),
        }
    }
}
