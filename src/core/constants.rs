//! Core constants shared by the index, the tile renderer and the response encoder.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level accepted for tile requests.
pub const MAX_ZOOM: u8 = 30;

/// Page size used when a query does not specify a limit.
pub const DEFAULT_LIMIT: i64 = 10;

/// Upper bound for the page size of a single query.
pub const MAX_LIMIT: i64 = 10_000;

/// Radius of the marker drawn for each feature, in tile pixels.
pub const MARKER_RADIUS: f64 = 2.0;

/// Marker fill colour (opaque RGBA).
pub const MARKER_COLOR: [u8; 4] = [195, 66, 244, 255];

/// Number of independently locked tile cache shards.
pub const TILE_CACHE_SHARDS: usize = 128;

/// Default number of cached tiles across all shards.
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 10_000;

/// Default interval between polling passes of the reload loop.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Page size of a tile feature-info lookup.
pub const FEATURE_INFO_LIMIT: i64 = 10;

/// Width of the box searched around a feature-info pixel.
pub const MAX_SIGNATURE_WIDTH: f64 = 8.0;

/// Media type of feature documents.
pub const GEOJSON_MEDIA_TYPE: &str = "application/geo+json";
