use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Open key-value bag holding a feature's original non-geometry properties.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single scalar property value.
///
/// Nested JSON arrays and objects have no scalar form; they are kept as their
/// compact JSON text in [`AttributeValue::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => AttributeValue::Number(f),
                None => AttributeValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => AttributeValue::Text(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                AttributeValue::Text(nested.to_string())
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A point of interest such as a curb ramp.
///
/// Features are immutable once loaded. The store hands them out behind `Arc`
/// so the index, engine results and cache can share them without copying.
///
/// # Examples
///
/// ```
/// use curbside_types::feature::Feature;
///
/// let ramp = Feature::new("ramp-42", 40.7128, -74.0060);
/// assert_eq!(ramp.longitude(), -74.0060);
/// assert!(ramp.attributes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Identifier, unique within one loaded store
    pub id: String,
    /// Location (x = longitude, y = latitude)
    pub point: Point<f64>,
    /// Original properties, preserved verbatim
    #[serde(default)]
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            point: Point::new(longitude, latitude),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.point.y()
    }

    pub fn longitude(&self) -> f64 {
        self.point.x()
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_from_json_scalars() {
        assert_eq!(AttributeValue::from(json!(null)), AttributeValue::Null);
        assert_eq!(AttributeValue::from(json!(true)), AttributeValue::Bool(true));
        assert_eq!(AttributeValue::from(json!(2.5)), AttributeValue::Number(2.5));
        assert_eq!(
            AttributeValue::from(json!("curb")),
            AttributeValue::Text("curb".to_string())
        );
    }

    #[test]
    fn test_attribute_from_nested_json_keeps_text() {
        let value = AttributeValue::from(json!({"a": [1, 2]}));
        assert_eq!(value.as_str(), Some(r#"{"a":[1,2]}"#));
    }

    #[test]
    fn test_feature_accessors() {
        let feature = Feature::new("f", 37.775, -122.419);
        assert_eq!(feature.latitude(), 37.775);
        assert_eq!(feature.longitude(), -122.419);
        assert!(feature.attribute("missing").is_none());
    }
}
