use serde::{Deserialize, Serialize};

/// Counters describing how a proximity session has handled location updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Location updates received
    pub updates_received: u64,
    /// Updates ignored because the consuming view was hidden
    pub updates_hidden: u64,
    /// Updates rejected by the throttle gate
    pub updates_throttled: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Cache entries dropped because the location drifted too far
    pub cache_invalidations: u64,
    /// Cache entries dropped to stay within capacity
    pub cache_evictions: u64,
    /// Engine queries actually executed
    pub queries_executed: u64,
    /// Queries that exceeded the slow-query threshold
    pub slow_queries: u64,
    /// Queries rejected as invalid
    pub invalid_queries: u64,
    /// Queries answered by linear scan because no index was available
    pub linear_scans: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of admitted lookups served from cache.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
