//! Proximity session: the owned service a trip screen drives.
//!
//! A session ties together the feature store, the engine built over it, the
//! result cache and the throttle gate. It is created by the screen that needs
//! nearby obstacles, initialised when that screen mounts and torn down when it
//! unmounts; there is no process-wide instance.
//!
//! Per location update the pipeline is:
//! visibility check → throttle → cache lookup → engine query → cache store.
//! Any failure past loading degrades to "nothing nearby".

use crate::cache::{CacheLookup, CachedResults, QueryCache};
use crate::compute::validation::validate_geographic_point;
use crate::config::Config;
use crate::engine::{NearbyFeature, ProximityEngine};
use crate::error::Result;
use crate::store::{FeatureSource, FeatureStore, LoadReport};
use crate::throttle::ThrottleGate;
use curbside_types::query::{LocationSample, ProximityQuery};
use curbside_types::stats::SessionStats;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Everything the location-update path mutates, kept behind one lock so the
/// cache read-modify-write sequence has a single writer.
struct PipelineState {
    cache: QueryCache,
    throttle: ThrottleGate,
    last_results: CachedResults,
    stats: SessionStats,
}

impl PipelineState {
    fn reset(&mut self) {
        self.cache.clear();
        self.throttle.reset();
        self.last_results = empty_results();
    }
}

pub struct ProximitySession {
    config: Config,
    store: FeatureStore,
    engine: RwLock<Arc<ProximityEngine>>,
    state: Mutex<PipelineState>,
    visible: AtomicBool,
}

impl ProximitySession {
    /// Create a session with the given configuration.
    ///
    /// Prefer [`crate::SessionBuilder`], which validates the configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let state = PipelineState {
            cache: QueryCache::new(
                config.cache_capacity,
                config.cache_precision,
                config.cache_invalidation_meters,
            ),
            throttle: ThrottleGate::new(config.throttle_interval()),
            last_results: empty_results(),
            stats: SessionStats::new(),
        };

        Ok(Self {
            store: FeatureStore::new(config.max_features),
            engine: RwLock::new(Arc::new(ProximityEngine::empty(config.max_results))),
            state: Mutex::new(state),
            visible: AtomicBool::new(true),
            config,
        })
    }

    /// Load features from `source` and rebuild the engine over them.
    ///
    /// The cache is always cleared. On failure the session keeps working with
    /// no features and the error is returned so the caller can show a notice.
    pub async fn initialize(&self, source: FeatureSource) -> Result<LoadReport> {
        let result = self.store.initialize(source).await;

        let engine = ProximityEngine::build(
            self.store.get_all(),
            self.config.cell_size_degrees,
            self.config.max_results,
        );
        if !engine.uses_index() {
            log::warn!("Spatial index unavailable; queries will scan all features");
        }
        self.swap_engine(engine);

        result
    }

    /// Replace the loaded dataset. Cached results from the old data are discarded.
    pub async fn reload(&self, source: FeatureSource) -> Result<LoadReport> {
        self.initialize(source).await
    }

    /// Release features and cached results. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.store.teardown();
        self.swap_engine(ProximityEngine::empty(self.config.max_results));
    }

    fn swap_engine(&self, engine: ProximityEngine) {
        // hold the pipeline lock so no update runs against the old engine with
        // the new (cleared) cache or vice versa
        let mut state = self.state.lock();
        *self.engine.write() = Arc::new(engine);
        state.reset();
    }

    fn current_engine(&self) -> Arc<ProximityEngine> {
        Arc::clone(&self.engine.read())
    }

    /// Feed one location fix through the pipeline and return the results to display.
    ///
    /// Hidden or throttled updates do no work and return the previous results.
    pub fn on_location(&self, sample: LocationSample) -> CachedResults {
        let mut state = self.state.lock();
        state.stats.updates_received += 1;

        if !self.is_visible() {
            state.stats.updates_hidden += 1;
            return Arc::clone(&state.last_results);
        }

        if !state.throttle.admit(sample.timestamp) {
            state.stats.updates_throttled += 1;
            return Arc::clone(&state.last_results);
        }

        // rounding would map a NaN fix onto a real cache key
        if let Err(e) = validate_geographic_point(&sample.point) {
            log::error!("Dropping location update: {}", e);
            state.stats.invalid_queries += 1;
            state.last_results = empty_results();
            return empty_results();
        }

        match state.cache.lookup(&sample.point) {
            CacheLookup::Hit(results) => {
                log::debug!("Cache hit with {} results", results.len());
                state.stats.cache_hits += 1;
                state.last_results = Arc::clone(&results);
                return results;
            }
            CacheLookup::Invalidated => {
                state.stats.cache_invalidations += 1;
                state.stats.cache_misses += 1;
            }
            CacheLookup::Miss => {
                log::debug!("Cache miss");
                state.stats.cache_misses += 1;
            }
        }

        let query = ProximityQuery::from_point(sample.point, self.config.default_radius_meters);
        let results: CachedResults = match self.run_query(&mut state.stats, &query) {
            Ok(results) => {
                let results: CachedResults = results.into();
                if state.cache.store(&sample.point, Arc::clone(&results)).is_some() {
                    state.stats.cache_evictions += 1;
                }
                results
            }
            Err(e) => {
                log::error!("Dropping location update: {}", e);
                empty_results()
            }
        };

        state.last_results = Arc::clone(&results);
        results
    }

    /// Run `query` immediately, bypassing visibility, throttle and cache.
    pub fn query_now(&self, query: &ProximityQuery) -> Result<Vec<NearbyFeature>> {
        let mut state = self.state.lock();
        self.run_query(&mut state.stats, query)
    }

    fn run_query(
        &self,
        stats: &mut SessionStats,
        query: &ProximityQuery,
    ) -> Result<Vec<NearbyFeature>> {
        let engine = self.current_engine();
        let started = Instant::now();
        let result = engine.query(query);
        let elapsed = started.elapsed();

        match &result {
            Ok(results) => {
                stats.queries_executed += 1;
                if !engine.uses_index() {
                    stats.linear_scans += 1;
                }
                if elapsed > self.config.slow_query_threshold() {
                    stats.slow_queries += 1;
                    log::warn!(
                        "Slow proximity query: {:?} for {} results over {} features",
                        elapsed,
                        results.len(),
                        engine.feature_count()
                    );
                }
            }
            Err(_) => stats.invalid_queries += 1,
        }

        result
    }

    /// Set whether the consuming view is on screen. While hidden, location
    /// updates do no work.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Results most recently returned by [`Self::on_location`].
    pub fn last_results(&self) -> CachedResults {
        Arc::clone(&self.state.lock().last_results)
    }

    pub fn stats(&self) -> SessionStats {
        self.state.lock().stats
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub fn feature_count(&self) -> usize {
        self.current_engine().feature_count()
    }

    pub fn cached_entries(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn empty_results() -> CachedResults {
    Arc::from(Vec::new())
}
