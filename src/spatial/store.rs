//! Immutable, file-backed snapshot of one feature collection.
//!
//! A [`FeatureStore`] re-serializes every feature once, compactly, into a
//! single contiguous buffer and keeps per-feature byte ranges next to the
//! derived indexes (bounds, projected centroid, identifier). Queries copy
//! bytes straight out of that buffer; only single-item lookups parse.

use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use fxhash::FxHashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::bounds::LatLngBounds;
use crate::core::geo::Point;
use crate::core::projection::project;
use crate::data::geojson::{Feature, FeatureCollection};
use crate::{Error, Result};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Name, location and modification time of a loaded collection.
///
/// Always handed out by value so callers keep a stable view after the
/// index lock is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
}

pub struct FeatureStore {
    metadata: CollectionMetadata,
    generation: u64,
    buffer: Vec<u8>,
    ranges: Vec<Range<usize>>,
    bounds: Vec<LatLngBounds>,
    centroids: Vec<Point>,
    ids: Vec<Option<String>>,
    by_id: FxHashMap<String, usize>,
    timestamps: BTreeMap<String, DateTime<Utc>>,
}

impl FeatureStore {
    /// Loads `path` as collection `name`.
    ///
    /// Fails with [`Error::NotModified`] without reading the file when its
    /// modification time is not strictly after `if_modified_since`.
    pub fn load(
        name: &str,
        path: &Path,
        if_modified_since: Option<DateTime<Utc>>,
    ) -> Result<FeatureStore> {
        let read_error = |source| Error::Read {
            path: path.to_path_buf(),
            source,
        };
        let absolute = std::path::absolute(path).map_err(read_error)?;
        let stat = fs::metadata(&absolute).map_err(read_error)?;
        let last_modified: DateTime<Utc> = stat.modified().map_err(read_error)?.into();

        if let Some(threshold) = if_modified_since {
            if last_modified <= threshold {
                return Err(Error::NotModified);
            }
        }

        let data = fs::read(&absolute).map_err(read_error)?;
        let collection: FeatureCollection =
            serde_json::from_slice(&data).map_err(|source| Error::Parse {
                path: absolute.clone(),
                source,
            })?;

        let metadata = CollectionMetadata {
            name: name.to_string(),
            path: absolute,
            last_modified,
        };
        let store = Self::from_collection(metadata, collection)?;
        info!(
            "loaded {} features into collection {} from {}",
            store.len(),
            name,
            store.metadata.path.display()
        );
        Ok(store)
    }

    /// Builds a store from an already parsed collection.
    pub fn from_collection(
        metadata: CollectionMetadata,
        collection: FeatureCollection,
    ) -> Result<FeatureStore> {
        let count = collection.features.len();
        let mut store = FeatureStore {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            buffer: Vec::new(),
            ranges: Vec::with_capacity(count),
            bounds: Vec::with_capacity(count),
            centroids: Vec::with_capacity(count),
            ids: Vec::with_capacity(count),
            by_id: FxHashMap::default(),
            timestamps: BTreeMap::new(),
            metadata,
        };

        for (name, timestamp) in collection.timestamps() {
            store.timestamps.insert(name, timestamp);
        }
        store
            .timestamps
            .insert("last_modified".to_string(), store.metadata.last_modified);
        store.timestamps.insert("loaded".to_string(), Utc::now());

        for (index, feature) in collection.features.iter().enumerate() {
            store.push(index, feature)?;
        }
        store.buffer.shrink_to_fit();
        Ok(store)
    }

    fn push(&mut self, index: usize, feature: &Feature) -> Result<()> {
        let id = feature.derived_id();
        if let Some(id) = &id {
            if self.by_id.contains_key(id) {
                warn!(
                    "collection {} has duplicate feature id {}; keeping the first occurrence",
                    self.metadata.name, id
                );
            } else {
                self.by_id.insert(id.clone(), index);
            }
        }

        let bounds = feature.bounds();
        let start = self.buffer.len();
        serde_json::to_writer(&mut self.buffer, feature)?;

        self.ranges.push(start..self.buffer.len());
        self.centroids.push(project(bounds.center()));
        self.bounds.push(bounds);
        self.ids.push(id);
        Ok(())
    }

    pub fn metadata(&self) -> &CollectionMetadata {
        &self.metadata
    }

    /// Identity of this snapshot; every load gets a fresh generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Compact GeoJSON bytes of the feature at `index`.
    pub fn feature_bytes(&self, index: usize) -> Option<&[u8]> {
        let range = self.ranges.get(index)?;
        self.buffer.get(range.clone())
    }

    /// Parses the feature at `index` on demand.
    pub fn feature(&self, index: usize) -> Result<Option<Feature>> {
        match self.feature_bytes(index) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.ids.get(index)?.as_deref()
    }

    /// The feature's identifier, but only when that identifier resolves
    /// back to this very feature, so it can be used to resume iteration.
    pub fn cursor_id(&self, index: usize) -> Option<&str> {
        let id = self.id(index)?;
        (self.index_of(id) == Some(index)).then_some(id)
    }

    pub fn bounds(&self) -> &[LatLngBounds] {
        &self.bounds
    }

    /// Web Mercator world-pixel position of each feature's bounds centre.
    pub fn centroids(&self) -> &[Point] {
        &self.centroids
    }

    /// Named collection timestamps, including `last_modified` and `loaded`.
    pub fn timestamps(&self) -> &BTreeMap<String, DateTime<Utc>> {
        &self.timestamps
    }

    /// Size of the backing buffer in bytes.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Drop for FeatureStore {
    fn drop(&mut self) {
        debug!(
            "releasing collection {} generation {} ({} bytes)",
            self.metadata.name,
            self.generation,
            self.buffer.len()
        );
    }
}

impl std::fmt::Debug for FeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("metadata", &self.metadata)
            .field("generation", &self.generation)
            .field("features", &self.len())
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}
