//! # Featurelet
//!
//! A file-backed index of GeoJSON feature collections that serves paged
//! bounding-box queries and raster tiles, and hot-reloads collections when
//! their files change on disk.
//!
//! Each collection lives in an immutable [`FeatureStore`] holding compact
//! pre-encoded feature bytes plus precomputed bounds. Reloads build a new
//! store off to the side and swap it in atomically, so queries always see
//! one complete snapshot.

pub mod core;
pub mod data;
#[cfg(feature = "debug")]
pub mod logging;
pub mod prelude;
pub mod spatial;
pub mod tiles;
pub use crate::core::constants;

use std::path::PathBuf;

// Re-export public API
pub use crate::core::{
    bounds::LatLngBounds,
    config::{CollectionSource, IndexConfig, TileCacheConfig},
    geo::{LatLng, Point, TileCoord},
};

pub use crate::data::geojson::{Feature, FeatureCollection, Geometry};

pub use crate::spatial::{
    index::{LoadStats, ReloadOutcome, SpatialIndex},
    query::{ItemsQuery, Preconditions},
    reload::ReloadTrigger,
    store::{CollectionMetadata, FeatureStore},
};

pub use crate::tiles::{TileCache, TileKey};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown collection or feature
    #[error("not found")]
    NotFound,

    #[error("collection not modified")]
    NotModified,

    #[error("collection has been modified")]
    Modified,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    /// Whether the error came from loading a collection file
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Error::Read { .. } | Error::Parse { .. })
    }
}
