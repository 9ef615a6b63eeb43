//! Nearby-obstacle lookup for trip recording.
//!
//! Loads a bundled GeoJSON collection of point features (curb ramps and other
//! accessibility obstacles), indexes them on a uniform lat/lon grid and answers
//! "what is within N meters of me" for a moving device. Location updates pass
//! through a visibility check, a one-per-second throttle and a location-keyed
//! result cache before reaching the engine.
//!
//! ```rust
//! use curbside::{FeatureSource, SessionBuilder};
//! use curbside_types::query::LocationSample;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let session = SessionBuilder::new().radius_meters(50.0).build()?;
//!
//! let doc = r#"{ "type": "FeatureCollection", "features": [
//!     { "type": "Feature", "id": "ramp-1",
//!       "geometry": { "type": "Point", "coordinates": [-122.4190, 37.7750] },
//!       "properties": { "condition": "cracked" } } ] }"#;
//! session.initialize(FeatureSource::from(doc)).await?;
//!
//! let nearby = session.on_location(LocationSample::now(37.7749, -122.4194));
//! assert_eq!(nearby.len(), 1);
//! assert_eq!(nearby[0].feature.id, "ramp-1");
//! # Ok::<(), curbside::CurbsideError>(())
//! # }).unwrap();
//! ```

pub mod builder;
pub mod cache;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod session;
pub mod store;
pub mod throttle;

pub use builder::SessionBuilder;
pub use cache::{CacheKey, CacheLookup, CachedResults, QueryCache};
pub use config::Config;
pub use engine::{NearbyFeature, ProximityEngine};
pub use error::{CurbsideError, Result};
pub use index::{CellKey, GridIndex};
pub use session::ProximitySession;
pub use store::{FeatureSet, FeatureSource, FeatureStore, LoadReport};
pub use throttle::ThrottleGate;

pub use compute::geojson::results_to_feature_collection;
pub use compute::{distance, validation};

pub use curbside_types::feature::{AttributeValue, Attributes, Feature};
pub use curbside_types::query::{LocationSample, ProximityQuery};
pub use curbside_types::stats::SessionStats;

pub use geo::Point;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{CurbsideError, Result, SessionBuilder};

    pub use crate::{Feature, LocationSample, NearbyFeature, ProximityQuery};

    pub use crate::{FeatureSource, LoadReport, ProximitySession};

    pub use crate::{Config, SessionStats};

    pub use geo::Point;
}
