//! Session builder for configuring proximity lookups.
//!
//! This module provides a builder pattern for creating sessions with
//! non-default search, cache and throttle settings.

use crate::config::Config;
use crate::error::Result;
use crate::session::ProximitySession;
use std::time::Duration;

/// Builder for [`ProximitySession`].
///
/// # Examples
///
/// ```rust
/// use curbside::SessionBuilder;
/// use std::time::Duration;
///
/// let session = SessionBuilder::new()
///     .radius_meters(30.0)
///     .max_results(20)
///     .throttle_interval(Duration::from_millis(500))
///     .visible(false)
///     .build()
///     .unwrap();
///
/// assert!(!session.is_visible());
/// assert_eq!(session.config().max_results, 20);
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: Config,
    visible: bool,
}

impl SessionBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            visible: true,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn cell_size_degrees(mut self, cell_size: f64) -> Self {
        self.config = self.config.with_cell_size_degrees(cell_size);
        self
    }

    /// Search radius applied to location updates.
    pub fn radius_meters(mut self, radius: f64) -> Self {
        self.config = self.config.with_default_radius(radius);
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.config = self.config.with_max_results(max_results);
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config = self.config.with_max_features(max_features);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_cache_capacity(capacity);
        self
    }

    pub fn cache_precision(mut self, precision: u32) -> Self {
        self.config = self.config.with_cache_precision(precision);
        self
    }

    pub fn cache_invalidation_meters(mut self, meters: f64) -> Self {
        self.config = self.config.with_cache_invalidation_meters(meters);
        self
    }

    pub fn throttle_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_throttle_interval(interval);
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.config = self.config.with_slow_query_threshold(threshold);
        self
    }

    /// Initial visibility of the consuming view.
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Validate the configuration and create the session.
    pub fn build(self) -> Result<ProximitySession> {
        let session = ProximitySession::new(self.config)?;
        session.set_visible(self.visible);
        Ok(session)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
