//! Feature store: the loaded, immutable obstacle collection.
//!
//! Loading is the only asynchronous step in the crate. The source is read with
//! `tokio::fs` and decoded on the blocking pool so the caller's event loop is
//! never stalled; everything downstream works on the resulting snapshot
//! synchronously.

use crate::compute::geojson::decode_feature_collection;
use crate::error::{CurbsideError, Result};
use bytes::Bytes;
use curbside_types::feature::Feature;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, read-only snapshot of loaded features.
pub type FeatureSet = Arc<[Arc<Feature>]>;

/// Where a feature collection comes from.
///
/// Resolving bundled asset locations is the host application's job; the store
/// only needs a path or the raw document.
#[derive(Debug, Clone)]
pub enum FeatureSource {
    Path(PathBuf),
    Bytes(Bytes),
    Text(String),
}

impl From<PathBuf> for FeatureSource {
    fn from(path: PathBuf) -> Self {
        FeatureSource::Path(path)
    }
}

impl From<Bytes> for FeatureSource {
    fn from(bytes: Bytes) -> Self {
        FeatureSource::Bytes(bytes)
    }
}

impl From<String> for FeatureSource {
    fn from(text: String) -> Self {
        FeatureSource::Text(text)
    }
}

impl From<&str> for FeatureSource {
    fn from(text: &str) -> Self {
        FeatureSource::Text(text.to_string())
    }
}

impl FeatureSource {
    async fn read(self) -> Result<Bytes> {
        match self {
            FeatureSource::Path(path) => tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| CurbsideError::Load(format!("{}: {}", path.display(), e))),
            FeatureSource::Bytes(bytes) => Ok(bytes),
            FeatureSource::Text(text) => Ok(Bytes::from(text)),
        }
    }
}

/// Summary of a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    pub truncated: usize,
}

/// Owner of the loaded feature collection.
///
/// The collection is replaced wholesale on each load and never mutated in
/// place; readers holding an older [`FeatureSet`] keep a consistent view.
pub struct FeatureStore {
    features: RwLock<FeatureSet>,
    ready: AtomicBool,
    max_features: usize,
}

impl FeatureStore {
    pub fn new(max_features: usize) -> Self {
        Self {
            features: RwLock::new(empty_set()),
            ready: AtomicBool::new(false),
            max_features,
        }
    }

    /// Load features from `source`, replacing any previous collection.
    ///
    /// On `Load` or `Parse` failure the store is left ready but empty, so
    /// queries against it simply find nothing.
    pub async fn initialize(&self, source: FeatureSource) -> Result<LoadReport> {
        match self.load(source).await {
            Ok((features, report)) => {
                *self.features.write() = features;
                self.ready.store(true, Ordering::Release);
                log::info!(
                    "Loaded {} features ({} skipped, {} truncated)",
                    report.loaded,
                    report.skipped,
                    report.truncated
                );
                Ok(report)
            }
            Err(e) => {
                *self.features.write() = empty_set();
                self.ready.store(true, Ordering::Release);
                log::error!("Feature load failed, continuing without obstacles: {}", e);
                Err(e)
            }
        }
    }

    async fn load(&self, source: FeatureSource) -> Result<(FeatureSet, LoadReport)> {
        let bytes = source.read().await?;
        let max_features = self.max_features;

        let decoded =
            tokio::task::spawn_blocking(move || decode_feature_collection(&bytes, max_features))
                .await??;

        let report = LoadReport {
            loaded: decoded.features.len(),
            skipped: decoded.skipped,
            truncated: decoded.truncated,
        };
        let features: FeatureSet = decoded.features.into_iter().map(Arc::new).collect();

        Ok((features, report))
    }

    /// Current snapshot; empty before loading, after a failed load or after teardown.
    pub fn get_all(&self) -> FeatureSet {
        self.features.read().clone()
    }

    /// Release the collection. Safe to call repeatedly.
    pub fn teardown(&self) {
        *self.features.write() = empty_set();
        self.ready.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.features.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }
}

fn empty_set() -> FeatureSet {
    Arc::from(Vec::new())
}
