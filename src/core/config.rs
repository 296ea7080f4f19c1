//! Configuration for the feature index, its reload loop and the tile cache.
//!
//! All structs deserialize with `#[serde(default)]`, so a partial document
//! only overrides the fields it names.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TILE_CACHE_CAPACITY, TILE_CACHE_SHARDS,
};
use crate::{Error, Result};

/// Top-level settings of a [`SpatialIndex`](crate::spatial::index::SpatialIndex)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Public URL prefix (ending in `/`) used for self and next links
    pub public_path: String,
    /// Seconds between polling passes of the reload loop
    pub poll_interval_secs: u64,
    /// Whether to start the background reload loop at all
    pub watch_files: bool,
    pub tile_cache: TileCacheConfig,
}

impl IndexConfig {
    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = public_path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_secs = interval.as_secs().max(1);
        self
    }

    pub fn with_watch_files(mut self, watch_files: bool) -> Self {
        self.watch_files = watch_files;
        self
    }

    pub fn with_tile_cache(mut self, tile_cache: TileCacheConfig) -> Self {
        self.tile_cache = tile_cache;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            public_path: "/".to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            watch_files: true,
            tile_cache: TileCacheConfig::default(),
        }
    }
}

/// Tile cache sizing. A capacity of zero disables caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCacheConfig {
    pub capacity: usize,
    pub shards: usize,
}

impl TileCacheConfig {
    pub fn disabled() -> Self {
        Self {
            capacity: 0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TILE_CACHE_CAPACITY,
            shards: TILE_CACHE_SHARDS,
        }
    }
}

/// A named collection backed by one GeoJSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSource {
    pub name: String,
    pub path: PathBuf,
}

impl CollectionSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parses `castles=path/to/castles.geojson,lakes=path/to/lakes.geojson`.
    pub fn parse_list(list: &str) -> Result<Vec<CollectionSource>> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
                    Ok(CollectionSource::new(name.trim(), path.trim()))
                }
                _ => Err(Error::MalformedInput(format!(
                    "malformed collection entry {entry:?}; expected name=path"
                ))),
            })
            .collect()
    }
}
