//! Prelude module for common featurelet types
//!
//! This module re-exports the most commonly used types and functions
//! for easy importing with `use featurelet::prelude::*;`

pub use crate::core::{
    bounds::{LatInterval, LatLngBounds, LngInterval},
    config::{CollectionSource, IndexConfig, TileCacheConfig},
    geo::{LatLng, Point, TileCoord},
    projection::{project, tile_bounds, unproject},
};

pub use crate::data::geojson::{Feature, FeatureCollection, Geometry, Properties};

pub use crate::spatial::{
    index::{LoadStats, ReloadOutcome, SpatialIndex},
    query::{parse_bbox, ItemsQuery, Preconditions},
    reload::{ReloadTrigger, Reloader},
    store::{CollectionMetadata, FeatureStore},
    wfs::{collections_document, format_items_url, Link},
};

pub use crate::tiles::{empty_tile, TileCache, TileKey};

pub use crate::{Error, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
