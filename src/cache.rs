//! Location-keyed cache of recent proximity results.
//!
//! Keys are coordinates rounded to a fixed number of decimal places. An entry
//! is only served while the live location stays within the invalidation
//! distance of the location that produced it; beyond that it is dropped. The
//! least recently used entry is evicted once capacity is exceeded. Finding
//! the victim is a linear scan over the entries, which is cheap at the small
//! capacities a trip screen uses.
//!
//! The cache is a plain single-owner struct. Callers that share it across
//! threads wrap it in one lock (see `ProximitySession`).

use crate::compute::distance::haversine_distance;
use crate::engine::NearbyFeature;
use geo::Point;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Shared, immutable result list.
pub type CachedResults = Arc<[NearbyFeature]>;

/// Rounded `(latitude, longitude)` in units of `10^-precision` degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub lat: i64,
    pub lon: i64,
}

#[derive(Debug)]
struct CacheEntry {
    origin: Point,
    results: CachedResults,
    last_used: u64,
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(CachedResults),
    Miss,
    /// An entry existed for the key but was produced too far away; it has been removed.
    Invalidated,
}

impl CacheLookup {
    pub fn hit(self) -> Option<CachedResults> {
        match self {
            CacheLookup::Hit(results) => Some(results),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

#[derive(Debug)]
pub struct QueryCache {
    capacity: usize,
    scale: f64,
    invalidation_meters: f64,
    entries: FxHashMap<CacheKey, CacheEntry>,
    clock: u64,
}

impl QueryCache {
    /// Create a cache holding at most `capacity` entries, keyed at
    /// `precision` decimal places.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use curbside::{CacheLookup, QueryCache};
    /// use geo::Point;
    /// use std::sync::Arc;
    ///
    /// let mut cache = QueryCache::new(10, 3, 10.0);
    /// let here = Point::new(-122.4194, 37.7749);
    /// assert!(matches!(cache.lookup(&here), CacheLookup::Miss));
    ///
    /// cache.store(&here, Arc::from(Vec::new()));
    /// assert!(cache.lookup(&here).is_hit());
    /// ```
    pub fn new(capacity: usize, precision: u32, invalidation_meters: f64) -> Self {
        Self {
            capacity: capacity.max(1),
            scale: 10f64.powi(precision as i32),
            invalidation_meters,
            entries: FxHashMap::default(),
            clock: 0,
        }
    }

    pub fn key_for(&self, point: &Point) -> CacheKey {
        CacheKey {
            lat: (point.y() * self.scale).round() as i64,
            lon: (point.x() * self.scale).round() as i64,
        }
    }

    /// Look up results for `point`, dropping the entry if `point` has drifted
    /// beyond the invalidation distance from where it was computed.
    pub fn lookup(&mut self, point: &Point) -> CacheLookup {
        let key = self.key_for(point);
        let Some(entry) = self.entries.get_mut(&key) else {
            return CacheLookup::Miss;
        };

        let drift = haversine_distance(&entry.origin, point);
        if drift.is_nan() || drift > self.invalidation_meters {
            log::debug!(
                "Cache entry {:?} invalidated after {:.1} m drift",
                key,
                drift
            );
            self.entries.remove(&key);
            return CacheLookup::Invalidated;
        }

        self.clock += 1;
        entry.last_used = self.clock;
        CacheLookup::Hit(Arc::clone(&entry.results))
    }

    /// Record `results` as computed at `point`, replacing any entry with the
    /// same key. Returns the key evicted to make room, if any.
    pub fn store(&mut self, point: &Point, results: CachedResults) -> Option<CacheKey> {
        let key = self.key_for(point);
        self.clock += 1;
        self.entries.insert(
            key,
            CacheEntry {
                origin: *point,
                results,
                last_used: self.clock,
            },
        );

        if self.entries.len() <= self.capacity {
            return None;
        }

        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(k, _)| *k)?;
        self.entries.remove(&victim);
        log::debug!("Cache entry {:?} evicted", victim);
        Some(victim)
    }

    /// Drop every entry. Must be called whenever the feature set changes.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }
}
