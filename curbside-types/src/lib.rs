//! # curbside-types
//!
//! Plain data types shared by the `curbside` proximity engine:
//!
//! - **Features**: `Feature`, `AttributeValue`, `Attributes`
//! - **Queries**: `ProximityQuery`, `LocationSample`
//! - **Statistics**: `SessionStats`
//!
//! Coordinates follow the `geo` convention: `x` is longitude, `y` is latitude,
//! both in WGS84 degrees.
//!
//! ## Examples
//!
//! ```rust
//! use curbside_types::feature::{AttributeValue, Feature};
//! use curbside_types::query::ProximityQuery;
//!
//! let mut ramp = Feature::new("ramp-1", 37.7750, -122.4190);
//! ramp.attributes
//!     .insert("condition".to_string(), AttributeValue::from("good"));
//!
//! let query = ProximityQuery::new(37.7749, -122.4194, 50.0);
//! assert_eq!(query.latitude(), 37.7749);
//! assert_eq!(ramp.latitude(), 37.7750);
//! ```

pub mod feature;
pub mod query;
pub mod stats;
