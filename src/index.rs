//! Uniform lat/lon grid index over a feature snapshot.
//!
//! Each feature lands in exactly one cell, keyed by
//! `(floor(lat / cell_size), floor(lon / cell_size))`. A radius lookup walks
//! the block of cells the radius can reach and returns every feature in them.
//! The result is a candidate superset: callers must still filter by exact
//! distance.
//!
//! The row span is `ceil(radius / metres-per-cell)`. The column span is
//! widened by `1 / cos(lat)` for the highest latitude the radius can reach,
//! and wraps across the antimeridian, so no feature within the radius is ever
//! missed. Near the poles every column is searched.

use crate::compute::distance::{meters_to_latitude_degrees, meters_to_longitude_degrees};
use crate::error::{CurbsideError, Result};
use crate::store::FeatureSet;
use curbside_types::feature::Feature;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// `(row, column)` of a grid cell.
pub type CellKey = (i64, i64);

/// Largest cell coordinate magnitude accepted; keeps span arithmetic far from overflow.
const MAX_CELL_COORD: f64 = (1u64 << 52) as f64;

/// Slack applied to span calculations so rounding never shrinks the search block.
const SPAN_EPSILON: f64 = 1e-9;

type Bucket = SmallVec<[u32; 4]>;

enum ColumnSpan {
    All,
    Ranges(SmallVec<[RangeInclusive<i64>; 3]>),
}

impl ColumnSpan {
    fn contains(&self, col: i64) -> bool {
        match self {
            ColumnSpan::All => true,
            ColumnSpan::Ranges(ranges) => ranges.iter().any(|r| r.contains(&col)),
        }
    }

    fn width(&self) -> Option<u64> {
        match self {
            ColumnSpan::All => None,
            ColumnSpan::Ranges(ranges) => Some(
                ranges
                    .iter()
                    .map(|r| (r.end() - r.start() + 1).max(0) as u64)
                    .sum(),
            ),
        }
    }
}

/// Grid index holding positions into a shared [`FeatureSet`].
///
/// The index keeps its own handle on the snapshot it was built from, so it can
/// never refer to features that have been released.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_size: f64,
    features: FeatureSet,
    cells: FxHashMap<CellKey, Bucket>,
}

impl GridIndex {
    /// Build the index in a single pass over `features`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use curbside::GridIndex;
    /// use curbside_types::feature::Feature;
    /// use std::sync::Arc;
    ///
    /// let features: Arc<[Arc<Feature>]> = vec![
    ///     Arc::new(Feature::new("a", 37.7750, -122.4190)),
    ///     Arc::new(Feature::new("b", 37.7900, -122.4000)),
    /// ]
    /// .into();
    ///
    /// let index = GridIndex::build(features, 0.001).unwrap();
    /// let candidates = index.candidates_near(37.7749, -122.4194, 20.0);
    /// assert_eq!(candidates.len(), 1);
    /// assert_eq!(candidates[0].id, "a");
    /// ```
    pub fn build(features: FeatureSet, cell_size_degrees: f64) -> Result<Self> {
        if !cell_size_degrees.is_finite() || cell_size_degrees <= 0.0 {
            return Err(CurbsideError::IndexBuild(format!(
                "Cell size must be finite and positive, got: {}",
                cell_size_degrees
            )));
        }

        if features.len() > u32::MAX as usize {
            return Err(CurbsideError::IndexBuild(format!(
                "Too many features to index: {}",
                features.len()
            )));
        }

        let mut cells: FxHashMap<CellKey, Bucket> = FxHashMap::default();
        for (pos, feature) in features.iter().enumerate() {
            let key = checked_cell_key(feature.latitude(), feature.longitude(), cell_size_degrees)
                .ok_or_else(|| {
                    CurbsideError::IndexBuild(format!(
                        "Feature {} has unindexable coordinates ({}, {})",
                        feature.id,
                        feature.latitude(),
                        feature.longitude()
                    ))
                })?;
            cells.entry(key).or_default().push(pos as u32);
        }

        Ok(Self {
            cell_size: cell_size_degrees,
            features,
            cells,
        })
    }

    /// Cell containing `(latitude, longitude)`.
    pub fn cell_of(&self, latitude: f64, longitude: f64) -> CellKey {
        cell_key(latitude, longitude, self.cell_size)
    }

    /// Every feature that could lie within `radius_meters` of the point.
    ///
    /// Non-finite input or a non-positive radius yields no candidates.
    pub fn candidates_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Vec<&Arc<Feature>> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !radius_meters.is_finite()
            || radius_meters <= 0.0
            || self.cells.is_empty()
        {
            return Vec::new();
        }

        let (row, _) = self.cell_of(latitude, longitude);
        let lat_delta = meters_to_latitude_degrees(radius_meters);
        let row_span = self.span(lat_delta);
        let rows = row.saturating_sub(row_span)..=row.saturating_add(row_span);
        let columns = self.column_span(latitude, longitude, radius_meters);

        let block_size = columns
            .width()
            .map(|w| w.saturating_mul((2 * row_span + 1) as u64));

        let mut candidates = Vec::new();
        match (&columns, block_size) {
            (ColumnSpan::Ranges(ranges), Some(size)) if size <= self.cells.len() as u64 => {
                for r in rows {
                    for cols in ranges {
                        for c in cols.clone() {
                            if let Some(bucket) = self.cells.get(&(r, c)) {
                                candidates.extend(bucket.iter().map(|&i| &self.features[i as usize]));
                            }
                        }
                    }
                }
            }
            // the block is larger than the occupied grid: filter occupied cells instead
            _ => {
                for (&(r, c), bucket) in &self.cells {
                    if rows.contains(&r) && columns.contains(c) {
                        candidates.extend(bucket.iter().map(|&i| &self.features[i as usize]));
                    }
                }
            }
        }

        candidates
    }

    fn span(&self, delta_degrees: f64) -> i64 {
        let cells = (delta_degrees / self.cell_size * (1.0 + SPAN_EPSILON)).ceil();
        cells.min(MAX_CELL_COORD) as i64
    }

    fn column_span(&self, latitude: f64, longitude: f64, radius_meters: f64) -> ColumnSpan {
        let Some(lon_delta) = meters_to_longitude_degrees(radius_meters, latitude) else {
            return ColumnSpan::All;
        };

        let (_, col) = self.cell_of(latitude, longitude);
        let col_span = self.span(lon_delta);
        let mut ranges: SmallVec<[RangeInclusive<i64>; 3]> = SmallVec::new();
        ranges.push(col.saturating_sub(col_span)..=col.saturating_add(col_span));

        let west_edge = self.column(-180.0);
        let east_edge = self.column(180.0);
        if longitude - lon_delta < -180.0 {
            ranges.push(self.column(longitude - lon_delta + 360.0) - 1..=east_edge);
        }
        if longitude + lon_delta > 180.0 {
            ranges.push(west_edge..=self.column(longitude + lon_delta - 360.0) + 1);
        }

        ColumnSpan::Ranges(merge_ranges(ranges))
    }

    fn column(&self, longitude: f64) -> i64 {
        (longitude / self.cell_size).floor() as i64
    }

    /// The snapshot this index was built over.
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Cell key for a coordinate under floor division by `cell_size`.
pub fn cell_key(latitude: f64, longitude: f64, cell_size: f64) -> CellKey {
    (
        (latitude / cell_size).floor() as i64,
        (longitude / cell_size).floor() as i64,
    )
}

/// Sort and coalesce overlapping column ranges so no cell is visited twice.
fn merge_ranges(
    mut ranges: SmallVec<[RangeInclusive<i64>; 3]>,
) -> SmallVec<[RangeInclusive<i64>; 3]> {
    ranges.sort_by_key(|r| *r.start());
    let mut merged: SmallVec<[RangeInclusive<i64>; 3]> = SmallVec::new();
    for range in ranges {
        match merged.last_mut() {
            Some(last) if *range.start() <= last.end().saturating_add(1) => {
                if range.end() > last.end() {
                    *last = *last.start()..=*range.end();
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

fn checked_cell_key(latitude: f64, longitude: f64, cell_size: f64) -> Option<CellKey> {
    let row = (latitude / cell_size).floor();
    let col = (longitude / cell_size).floor();
    if row.is_finite() && col.is_finite() && row.abs() < MAX_CELL_COORD && col.abs() < MAX_CELL_COORD
    {
        Some((row as i64, col as i64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_set(points: &[(&str, f64, f64)]) -> FeatureSet {
        points
            .iter()
            .map(|(id, lat, lon)| Arc::new(Feature::new(*id, *lat, *lon)))
            .collect()
    }

    fn ids(candidates: &[&Arc<Feature>]) -> Vec<String> {
        let mut ids: Vec<String> = candidates.iter().map(|f| f.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_each_feature_in_one_cell() {
        let features = feature_set(&[
            ("a", 37.7753, -122.4193),
            ("b", 37.7756, -122.4196),
            ("c", 37.7905, -122.4005),
        ]);
        let index = GridIndex::build(features, 0.001).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.cell_count(), 2);
        assert_eq!(index.cell_of(37.7753, -122.4193), (37775, -122420));
    }

    #[test]
    fn test_negative_coordinates_floor_down() {
        assert_eq!(cell_key(-0.0005, -0.0005, 0.001), (-1, -1));
        assert_eq!(cell_key(0.0005, 0.0005, 0.001), (0, 0));
    }

    #[test]
    fn test_default_neighbourhood_is_three_by_three() {
        // one feature in each of the 5x5 cells around (0.0005, 0.0005)
        let mut points = Vec::new();
        for r in -2..=2 {
            for c in -2..=2 {
                points.push((
                    format!("{}:{}", r, c),
                    r as f64 * 0.001 + 0.0005,
                    c as f64 * 0.001 + 0.0005,
                ));
            }
        }
        let features: FeatureSet = points
            .iter()
            .map(|(id, lat, lon)| Arc::new(Feature::new(id.clone(), *lat, *lon)))
            .collect();
        let index = GridIndex::build(features, 0.001).unwrap();

        let candidates = index.candidates_near(0.0005, 0.0005, 20.0);
        assert_eq!(candidates.len(), 9);
    }

    #[test]
    fn test_query_on_cell_boundary_sees_neighbours() {
        let features = feature_set(&[
            ("ne", 0.0001, 0.0001),
            ("nw", 0.0001, -0.0001),
            ("se", -0.0001, 0.0001),
            ("sw", -0.0001, -0.0001),
        ]);
        let index = GridIndex::build(features, 0.001).unwrap();
        let candidates = index.candidates_near(0.0, 0.0, 20.0);
        assert_eq!(ids(&candidates), vec!["ne", "nw", "se", "sw"]);
    }

    #[test]
    fn test_wraps_across_antimeridian() {
        let features = feature_set(&[("east", 0.0, 179.9999), ("west", 0.0, -179.9999)]);
        let index = GridIndex::build(features, 0.001).unwrap();
        assert_eq!(ids(&index.candidates_near(0.0, 179.99995, 30.0)), vec!["east", "west"]);
        assert_eq!(ids(&index.candidates_near(0.0, -179.99995, 30.0)), vec!["east", "west"]);
    }

    #[test]
    fn test_polar_query_searches_all_columns() {
        let features = feature_set(&[("a", 89.9999, 0.0), ("b", 89.9999, 180.0)]);
        let index = GridIndex::build(features, 0.001).unwrap();
        assert_eq!(index.candidates_near(90.0, 0.0, 50.0).len(), 2);
    }

    #[test]
    fn test_far_features_are_not_candidates() {
        let features = feature_set(&[("near", 40.0, -74.0), ("far", 41.0, -74.0)]);
        let index = GridIndex::build(features, 0.001).unwrap();
        assert_eq!(ids(&index.candidates_near(40.0, -74.0, 20.0)), vec!["near"]);
    }

    #[test]
    fn test_large_radius_uses_occupied_cells() {
        let features = feature_set(&[("a", 40.0, -74.0), ("b", 40.5, -74.5)]);
        let index = GridIndex::build(features, 0.001).unwrap();
        assert_eq!(index.candidates_near(40.2, -74.2, 100_000.0).len(), 2);
    }

    #[test]
    fn test_invalid_input_yields_nothing() {
        let index = GridIndex::build(feature_set(&[("a", 0.0, 0.0)]), 0.001).unwrap();
        assert!(index.candidates_near(f64::NAN, 0.0, 20.0).is_empty());
        assert!(index.candidates_near(0.0, 0.0, -1.0).is_empty());
    }

    #[test]
    fn test_build_rejects_bad_cell_size() {
        let features = feature_set(&[("a", 0.0, 0.0)]);
        assert!(GridIndex::build(features.clone(), 0.0).is_err());
        assert!(GridIndex::build(features, f64::NAN).is_err());
    }

    #[test]
    fn test_build_rejects_unindexable_feature() {
        let features = feature_set(&[("bad", f64::NAN, 0.0)]);
        assert!(matches!(
            GridIndex::build(features, 0.001),
            Err(CurbsideError::IndexBuild(_))
        ));
    }

    #[test]
    fn test_merge_overlapping_ranges() {
        let ranges: SmallVec<[RangeInclusive<i64>; 3]> = SmallVec::from_vec(vec![5..=9, 0..=3, 2..=6]);
        assert_eq!(merge_ranges(ranges).into_vec(), vec![0..=9]);

        let disjoint: SmallVec<[RangeInclusive<i64>; 3]> = SmallVec::from_vec(vec![10..=12, 0..=3]);
        assert_eq!(merge_ranges(disjoint).into_vec(), vec![0..=3, 10..=12]);
    }

    #[test]
    fn test_empty_index() {
        let index = GridIndex::build(feature_set(&[]), 0.001).unwrap();
        assert!(index.is_empty());
        assert!(index.candidates_near(0.0, 0.0, 20.0).is_empty());
    }
}
