//! Proximity query engine: exact distance filtering over index candidates.

use crate::compute::distance::haversine_distance;
use crate::compute::validation::validate_query;
use crate::error::Result;
use crate::index::GridIndex;
use crate::store::FeatureSet;
use curbside_types::feature::Feature;
use curbside_types::query::ProximityQuery;
use std::cmp::Ordering;
use std::sync::Arc;

/// A feature within the query radius, with its distance from the query origin.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyFeature {
    pub feature: Arc<Feature>,
    pub distance_meters: f64,
}

/// Closest first; equal distances fall back to feature id so results are deterministic.
fn by_distance_then_id(a: &NearbyFeature, b: &NearbyFeature) -> Ordering {
    a.distance_meters
        .total_cmp(&b.distance_meters)
        .then_with(|| a.feature.id.cmp(&b.feature.id))
}

/// Answers radius queries over one feature snapshot.
///
/// The engine is immutable once built. A dataset reload produces a new engine
/// rather than modifying this one, so concurrent readers never observe a
/// half-built index.
#[derive(Debug, Clone)]
pub struct ProximityEngine {
    features: FeatureSet,
    index: Option<GridIndex>,
    max_results: usize,
}

impl ProximityEngine {
    /// Build an engine, indexing `features` with the given cell size.
    ///
    /// If the index cannot be built the engine falls back to scanning every
    /// feature; the failure is logged and never reaches the caller.
    pub fn build(features: FeatureSet, cell_size_degrees: f64, max_results: usize) -> Self {
        match GridIndex::build(features.clone(), cell_size_degrees) {
            Ok(index) => Self::with_index(index, max_results),
            Err(e) => {
                log::warn!("Falling back to linear scan: {}", e);
                Self::linear(features, max_results)
            }
        }
    }

    pub fn with_index(index: GridIndex, max_results: usize) -> Self {
        Self {
            features: index.features().clone(),
            index: Some(index),
            max_results,
        }
    }

    /// An engine that always scans the full feature list.
    pub fn linear(features: FeatureSet, max_results: usize) -> Self {
        Self {
            features,
            index: None,
            max_results,
        }
    }

    /// An engine over no features; every query returns an empty result.
    pub fn empty(max_results: usize) -> Self {
        Self::linear(Arc::from(Vec::new()), max_results)
    }

    /// Features within `query.radius_meters` of the query origin, closest
    /// first, capped at `max_results`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use curbside::ProximityEngine;
    /// use curbside_types::feature::Feature;
    /// use curbside_types::query::ProximityQuery;
    /// use std::sync::Arc;
    ///
    /// let features: Arc<[Arc<Feature>]> =
    ///     vec![Arc::new(Feature::new("ramp", 37.7750, -122.4190))].into();
    /// let engine = ProximityEngine::build(features, 0.001, 50);
    ///
    /// let near = engine.query(&ProximityQuery::new(37.7749, -122.4194, 20.0)).unwrap();
    /// assert!(near.is_empty());
    ///
    /// let wider = engine.query(&ProximityQuery::new(37.7749, -122.4194, 50.0)).unwrap();
    /// assert_eq!(wider.len(), 1);
    /// ```
    pub fn query(&self, query: &ProximityQuery) -> Result<Vec<NearbyFeature>> {
        validate_query(query)?;

        let radius = query.radius_meters;
        let mut hits: Vec<NearbyFeature> = match &self.index {
            Some(index) => index
                .candidates_near(query.latitude(), query.longitude(), radius)
                .into_iter()
                .filter_map(|feature| within(query, feature, radius))
                .collect(),
            None => self
                .features
                .iter()
                .filter_map(|feature| within(query, feature, radius))
                .collect(),
        };

        if hits.len() > self.max_results {
            match self.max_results.checked_sub(1) {
                Some(nth) => {
                    hits.select_nth_unstable_by(nth, by_distance_then_id);
                    hits.truncate(self.max_results);
                }
                None => hits.clear(),
            }
        }
        hits.sort_by(by_distance_then_id);

        Ok(hits)
    }

    pub fn uses_index(&self) -> bool {
        self.index.is_some()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }
}

fn within(query: &ProximityQuery, feature: &Arc<Feature>, radius: f64) -> Option<NearbyFeature> {
    let distance = haversine_distance(&query.point, &feature.point);
    (distance <= radius).then(|| NearbyFeature {
        feature: Arc::clone(feature),
        distance_meters: distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurbsideError;

    fn feature_set(points: &[(&str, f64, f64)]) -> FeatureSet {
        points
            .iter()
            .map(|(id, lat, lon)| Arc::new(Feature::new(*id, *lat, *lon)))
            .collect()
    }

    fn ids(results: &[NearbyFeature]) -> Vec<&str> {
        results.iter().map(|r| r.feature.id.as_str()).collect()
    }

    #[test]
    fn test_radius_cutoff() {
        let engine = ProximityEngine::build(feature_set(&[("ramp", 37.7750, -122.4190)]), 0.001, 50);

        let excluded = engine
            .query(&ProximityQuery::new(37.7749, -122.4194, 20.0))
            .unwrap();
        assert!(excluded.is_empty());

        let included = engine
            .query(&ProximityQuery::new(37.7749, -122.4194, 50.0))
            .unwrap();
        assert_eq!(ids(&included), vec!["ramp"]);
        assert!((included[0].distance_meters - 36.87).abs() < 0.05);
    }

    #[test]
    fn test_sorted_closest_first() {
        let engine = ProximityEngine::build(
            feature_set(&[
                ("far", 40.00015, -74.0),
                ("near", 40.00005, -74.0),
                ("mid", 40.0001, -74.0),
            ]),
            0.001,
            50,
        );
        let results = engine.query(&ProximityQuery::new(40.0, -74.0, 20.0)).unwrap();
        assert_eq!(ids(&results), vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_cap_keeps_closest() {
        let points: Vec<(String, f64, f64)> = (0..10)
            .map(|i| (format!("f{}", i), 40.0 + i as f64 * 0.00001, -74.0))
            .collect();
        let features: FeatureSet = points
            .iter()
            .map(|(id, lat, lon)| Arc::new(Feature::new(id.clone(), *lat, *lon)))
            .collect();
        let engine = ProximityEngine::build(features, 0.001, 3);

        let results = engine.query(&ProximityQuery::new(40.0, -74.0, 20.0)).unwrap();
        assert_eq!(ids(&results), vec!["f0", "f1", "f2"]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let engine = ProximityEngine::build(
            feature_set(&[
                ("c", 40.0001, -74.0),
                ("a", 40.0001, -74.0),
                ("b", 40.0001, -74.0),
            ]),
            0.001,
            2,
        );
        let results = engine.query(&ProximityQuery::new(40.0, -74.0, 20.0)).unwrap();
        assert_eq!(ids(&results), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_query_is_rejected() {
        let engine = ProximityEngine::build(feature_set(&[("a", 0.0, 0.0)]), 0.001, 50);
        for query in [
            ProximityQuery::new(0.0, 0.0, 0.0),
            ProximityQuery::new(0.0, 0.0, f64::NAN),
            ProximityQuery::new(95.0, 0.0, 20.0),
            ProximityQuery::new(0.0, f64::INFINITY, 20.0),
        ] {
            assert!(matches!(
                engine.query(&query),
                Err(CurbsideError::InvalidQuery(_))
            ));
        }
    }

    #[test]
    fn test_linear_fallback_on_bad_cell_size() {
        let engine = ProximityEngine::build(feature_set(&[("a", 0.0, 0.0)]), -1.0, 50);
        assert!(!engine.uses_index());
        let results = engine.query(&ProximityQuery::new(0.0, 0.0, 5.0)).unwrap();
        assert_eq!(ids(&results), vec!["a"]);
    }

    #[test]
    fn test_zero_cap_returns_nothing() {
        let engine = ProximityEngine::build(feature_set(&[("a", 0.0, 0.0), ("b", 0.0, 0.00001)]), 0.001, 0);
        let results = engine.query(&ProximityQuery::new(0.0, 0.0, 10.0)).unwrap();
        assert!(results.is_empty());

        let linear = ProximityEngine::linear(engine.features().clone(), 0);
        assert!(linear.query(&ProximityQuery::new(0.0, 0.0, 10.0)).unwrap().is_empty());
    }

    #[test]
    fn test_empty_engine() {
        let engine = ProximityEngine::empty(50);
        assert_eq!(engine.feature_count(), 0);
        let results = engine.query(&ProximityQuery::new(0.0, 0.0, 20.0)).unwrap();
        assert!(results.is_empty());
    }
}
