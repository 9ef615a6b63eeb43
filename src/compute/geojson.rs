//! GeoJSON decoding of point-feature collections, and encoding of query results.
//!
//! Decoding is lenient per entry and strict at the top level: a document that
//! is not a `FeatureCollection` fails, while individual entries with missing,
//! non-numeric or out-of-range coordinates are skipped and counted.

use crate::compute::validation::is_valid_coordinate;
use crate::engine::NearbyFeature;
use crate::error::{CurbsideError, Result};
use curbside_types::feature::{AttributeValue, Attributes, Feature};
use geojson::feature::Id;
use geojson::{FeatureCollection, Geometry, JsonObject, Value};
use rustc_hash::FxHashSet;
use serde_json::Map;

/// Outcome of decoding one document.
#[derive(Debug, Default)]
pub struct DecodedFeatures {
    pub features: Vec<Feature>,
    /// Entries rejected for bad shape, bad coordinates or duplicate ids
    pub skipped: usize,
    /// Valid entries dropped because the feature ceiling was reached
    pub truncated: usize,
}

/// Decodes a GeoJSON `FeatureCollection` of points.
///
/// # Examples
///
/// ```rust
/// use curbside::compute::geojson::decode_feature_collection;
///
/// let doc = br#"{
///   "type": "FeatureCollection",
///   "features": [
///     { "type": "Feature", "id": "ramp-1",
///       "geometry": { "type": "Point", "coordinates": [-122.419, 37.775] },
///       "properties": { "condition": "good" } },
///     { "type": "Feature",
///       "geometry": { "type": "Point", "coordinates": [-122.419, 137.775] },
///       "properties": {} }
///   ]
/// }"#;
///
/// let decoded = decode_feature_collection(doc, 100).unwrap();
/// assert_eq!(decoded.features.len(), 1);
/// assert_eq!(decoded.skipped, 1);
/// ```
pub fn decode_feature_collection(bytes: &[u8], max_features: usize) -> Result<DecodedFeatures> {
    let document: serde_json::Value = serde_json::from_slice(bytes)?;

    let serde_json::Value::Object(mut root) = document else {
        return Err(CurbsideError::Parse(
            "Top-level GeoJSON value is not an object".to_string(),
        ));
    };

    match root.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") => {}
        Some(other) => {
            return Err(CurbsideError::Parse(format!(
                "Expected a FeatureCollection, got: {}",
                other
            )));
        }
        None => {
            return Err(CurbsideError::Parse(
                "GeoJSON object has no \"type\" member".to_string(),
            ));
        }
    }

    let entries = match root.remove("features") {
        Some(serde_json::Value::Array(entries)) => entries,
        _ => {
            return Err(CurbsideError::Parse(
                "FeatureCollection has no \"features\" array".to_string(),
            ));
        }
    };

    let mut decoded = DecodedFeatures {
        features: Vec::with_capacity(entries.len().min(max_features)),
        ..Default::default()
    };
    let mut seen_ids: FxHashSet<String> = FxHashSet::default();

    for (idx, entry) in entries.into_iter().enumerate() {
        let Some(feature) = decode_entry(idx, entry) else {
            decoded.skipped += 1;
            continue;
        };

        if !seen_ids.insert(feature.id.clone()) {
            log::debug!("Skipping entry {}: duplicate id {}", idx, feature.id);
            decoded.skipped += 1;
            continue;
        }

        if decoded.features.len() >= max_features {
            decoded.truncated += 1;
            continue;
        }

        decoded.features.push(feature);
    }

    if decoded.truncated > 0 {
        log::warn!(
            "Feature ceiling of {} reached; dropped {} further entries",
            max_features,
            decoded.truncated
        );
    }

    Ok(decoded)
}

fn decode_entry(idx: usize, entry: serde_json::Value) -> Option<Feature> {
    let feature = match geojson::Feature::from_json_value(entry) {
        Ok(feature) => feature,
        Err(e) => {
            log::debug!("Skipping entry {}: {}", idx, e);
            return None;
        }
    };

    let coords = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Point(coords)) if coords.len() >= 2 => coords,
        Some(_) => {
            log::debug!("Skipping entry {}: geometry is not a 2D point", idx);
            return None;
        }
        None => {
            log::debug!("Skipping entry {}: no geometry", idx);
            return None;
        }
    };

    let (longitude, latitude) = (coords[0], coords[1]);
    if !is_valid_coordinate(longitude, latitude) {
        log::debug!(
            "Skipping entry {}: coordinates out of range ({}, {})",
            idx,
            longitude,
            latitude
        );
        return None;
    }

    let properties = feature.properties.unwrap_or_default();
    let id = feature_id(idx, feature.id.as_ref(), &properties);
    let attributes: Attributes = properties
        .into_iter()
        .map(|(k, v)| (k, AttributeValue::from(v)))
        .collect();

    Some(Feature::new(id, latitude, longitude).with_attributes(attributes))
}

/// The GeoJSON `id` member wins, then an `id` property, then the entry index.
fn feature_id(idx: usize, id: Option<&Id>, properties: &JsonObject) -> String {
    match id {
        Some(Id::String(s)) => return s.clone(),
        Some(Id::Number(n)) => return n.to_string(),
        None => {}
    }

    match properties.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => format!("feature-{}", idx),
    }
}

fn attribute_to_json(value: &AttributeValue) -> serde_json::Value {
    match value {
        AttributeValue::Null => serde_json::Value::Null,
        AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
        AttributeValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        AttributeValue::Text(s) => serde_json::Value::String(s.clone()),
    }
}

/// Encodes query results as a GeoJSON `FeatureCollection` for the map layer.
///
/// Each feature keeps its attributes and gains a `distance_m` property.
pub fn results_to_feature_collection(results: &[NearbyFeature]) -> Result<String> {
    let features: Vec<geojson::Feature> = results
        .iter()
        .map(|nearby| {
            let feature = &nearby.feature;
            let geom = Geometry::new(Value::Point(vec![feature.longitude(), feature.latitude()]));

            let mut props: Map<String, serde_json::Value> = feature
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect();
            props.insert(
                "distance_m".to_string(),
                attribute_to_json(&AttributeValue::Number(nearby.distance_meters)),
            );

            geojson::Feature {
                bbox: None,
                geometry: Some(geom),
                id: Some(Id::String(feature.id.clone())),
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    serde_json::to_string(&collection)
        .map_err(|e| CurbsideError::Parse(format!("Failed to serialize results: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn point_entry(id: serde_json::Value, coords: serde_json::Value) -> serde_json::Value {
        json!({
            "type": "Feature",
            "id": id,
            "geometry": { "type": "Point", "coordinates": coords },
            "properties": { "kind": "curb_ramp" }
        })
    }

    fn collection(entries: Vec<serde_json::Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({ "type": "FeatureCollection", "features": entries })).unwrap()
    }

    #[test]
    fn test_decode_valid_points() {
        let doc = collection(vec![
            point_entry(json!("a"), json!([-122.419, 37.775])),
            point_entry(json!(7), json!([-122.418, 37.776])),
        ]);
        let decoded = decode_feature_collection(&doc, 100).unwrap();
        assert_eq!(decoded.features.len(), 2);
        assert_eq!(decoded.features[0].id, "a");
        assert_eq!(decoded.features[1].id, "7");
        assert_eq!(decoded.features[0].latitude(), 37.775);
        assert_eq!(decoded.features[0].longitude(), -122.419);
        assert_eq!(
            decoded.features[0].attribute("kind"),
            Some(&AttributeValue::from("curb_ramp"))
        );
    }

    #[test]
    fn test_skips_bad_entries() {
        let doc = collection(vec![
            point_entry(json!("ok"), json!([0.0, 0.0])),
            point_entry(json!("lat"), json!([0.0, 91.0])),
            point_entry(json!("lon"), json!([-181.0, 0.0])),
            point_entry(json!("short"), json!([1.0])),
            point_entry(json!("text"), json!(["a", "b"])),
            json!({ "type": "Feature", "geometry": null, "properties": {} }),
            json!({ "type": "Feature", "properties": {} }),
            json!({
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
                "properties": {}
            }),
            json!(42),
        ]);
        let decoded = decode_feature_collection(&doc, 100).unwrap();
        assert_eq!(decoded.features.len(), 1);
        assert_eq!(decoded.skipped, 8);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let doc = collection(vec![
            point_entry(json!("dup"), json!([1.0, 1.0])),
            point_entry(json!("dup"), json!([2.0, 2.0])),
        ]);
        let decoded = decode_feature_collection(&doc, 100).unwrap();
        assert_eq!(decoded.features.len(), 1);
        assert_eq!(decoded.features[0].longitude(), 1.0);
        assert_eq!(decoded.skipped, 1);
    }

    #[test]
    fn test_id_fallbacks() {
        let doc = collection(vec![
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [1.0, 1.0] },
                "properties": { "id": "from-props" }
            }),
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [1.0, 1.0] },
                "properties": null
            }),
        ]);
        let decoded = decode_feature_collection(&doc, 100).unwrap();
        assert_eq!(decoded.features[0].id, "from-props");
        assert_eq!(decoded.features[1].id, "feature-1");
        assert!(decoded.features[1].attributes.is_empty());
    }

    #[test]
    fn test_ceiling_truncates() {
        let entries = (0..5)
            .map(|i| point_entry(json!(i), json!([i as f64, 0.0])))
            .collect();
        let decoded = decode_feature_collection(&collection(entries), 3).unwrap();
        assert_eq!(decoded.features.len(), 3);
        assert_eq!(decoded.truncated, 2);
        assert_eq!(decoded.skipped, 0);
    }

    #[test]
    fn test_top_level_errors() {
        for doc in [
            &b"not json"[..],
            br#"[1, 2, 3]"#,
            br#"{ "type": "Feature" }"#,
            br#"{ "features": [] }"#,
            br#"{ "type": "FeatureCollection", "features": {} }"#,
        ] {
            assert!(matches!(
                decode_feature_collection(doc, 10),
                Err(CurbsideError::Parse(_))
            ));
        }
    }

    #[test]
    fn test_encode_results() {
        let feature = Arc::new(
            Feature::new("ramp", 37.775, -122.419).with_attributes(Attributes::from([(
                "width".to_string(),
                AttributeValue::Number(1.2),
            )])),
        );
        let results = vec![NearbyFeature {
            feature,
            distance_meters: 12.5,
        }];

        let encoded = results_to_feature_collection(&results).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["id"], "ramp");
        assert_eq!(value["features"][0]["properties"]["distance_m"], 12.5);
        assert_eq!(value["features"][0]["properties"]["width"], 1.2);
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"],
            json!([-122.419, 37.775])
        );
    }
}
