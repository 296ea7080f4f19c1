use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use fxhash::FxHashMap;
use log::{debug, error, info, warn};

use crate::core::bounds::{LatInterval, LatLngBounds, LngInterval};
use crate::core::config::{CollectionSource, IndexConfig};
use crate::core::constants::{FEATURE_INFO_LIMIT, MAX_SIGNATURE_WIDTH, TILE_SIZE};
use crate::core::geo::{LatLng, TileCoord};
use crate::core::projection::{tile_bounds, unproject};
use crate::data::geojson::Feature;
use crate::spatial::query::{ItemsQuery, Preconditions};
use crate::spatial::reload::{ReloadTrigger, Reloader};
use crate::spatial::store::{CollectionMetadata, FeatureStore};
use crate::spatial::wfs::{format_items_url, FeatureCollectionWriter, Link};
use crate::tiles::{empty_tile, render_tile, TileCache, TileKey};
use crate::{Error, Result};

/// Counters describing load activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Successful loads, including the initial ones
    pub loads: u64,
    /// Failed reloads
    pub failures: u64,
    pub last_load: Option<DateTime<Utc>>,
}

/// Result of reconciling one collection with its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded,
    Unchanged,
    Failed,
}

/// Named feature collections, each served from an immutable
/// [`FeatureStore`] that is swapped wholesale on reload.
///
/// Readers clone the store's `Arc` under the read lock and scan it after
/// the lock is released, so a superseded store is freed once its last
/// in-flight query finishes.
pub struct SpatialIndex {
    config: IndexConfig,
    collections: RwLock<FxHashMap<String, Arc<FeatureStore>>>,
    tile_cache: Option<TileCache>,
    stats: Mutex<LoadStats>,
    reloader: Mutex<Option<Reloader>>,
    closed: AtomicBool,
}

impl SpatialIndex {
    /// Creates an empty index. Collections are added with
    /// [`add_collection`](Self::add_collection).
    pub fn new(config: IndexConfig) -> Self {
        let tile_cache = TileCache::from_config(&config.tile_cache);
        Self {
            config,
            collections: RwLock::new(FxHashMap::default()),
            tile_cache,
            stats: Mutex::new(LoadStats::default()),
            reloader: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Loads every source and, if configured, starts the reload loop.
    ///
    /// Any load failure is fatal here since there is nothing to serve yet.
    pub fn open(config: IndexConfig, sources: &[CollectionSource]) -> Result<Arc<SpatialIndex>> {
        let watch_files = config.watch_files;
        let index = Arc::new(SpatialIndex::new(config));
        for source in sources {
            index.add_collection(&source.name, &source.path)?;
        }
        if watch_files {
            index.start_reloader()?;
        }
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Loads `path` unconditionally and makes it the active store for
    /// `name`. A running reload loop also starts watching the file's
    /// directory.
    pub fn add_collection(&self, name: &str, path: impl AsRef<Path>) -> Result<CollectionMetadata> {
        let store = FeatureStore::load(name, path.as_ref(), None)?;
        let metadata = store.metadata().clone();
        self.publish(store);

        if let Some(directory) = metadata.path.parent() {
            let mut reloader = self.reloader();
            if let Some(reloader) = reloader.as_mut() {
                if let Err(e) = reloader.watch(directory) {
                    warn!(
                        "collection {name} is only polled, cannot watch {}: {e}",
                        directory.display()
                    );
                }
            }
        }
        Ok(metadata)
    }

    /// Starts the background reload loop; a running loop is replaced.
    pub fn start_reloader(self: &Arc<Self>) -> Result<()> {
        let reloader = Reloader::spawn(self, self.config.poll_interval())?;
        let previous = self.reloader().replace(reloader);
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(())
    }

    /// Metadata of every collection, ordered by name
    pub fn list_collections(&self) -> Vec<CollectionMetadata> {
        let mut collections: Vec<_> = self
            .read()
            .values()
            .map(|store| store.metadata().clone())
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        collections
    }

    /// The active store of a collection
    pub fn store(&self, collection: &str) -> Option<Arc<FeatureStore>> {
        self.read().get(collection).cloned()
    }

    pub fn collection_metadata(&self, collection: &str) -> Option<CollectionMetadata> {
        self.store(collection).map(|store| store.metadata().clone())
    }

    pub fn collection_timestamps(&self, collection: &str) -> Option<BTreeMap<String, DateTime<Utc>>> {
        self.store(collection).map(|store| store.timestamps().clone())
    }

    pub fn feature_count(&self, collection: &str) -> Option<usize> {
        self.store(collection).map(|store| store.len())
    }

    pub fn stats(&self) -> LoadStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether the reload loop receives file system notifications
    pub fn is_watching(&self) -> bool {
        self.reloader().as_ref().map_or(false, Reloader::is_watching)
    }

    pub fn tile_cache(&self) -> Option<&TileCache> {
        self.tile_cache.as_ref()
    }

    /// Looks up one feature by ID. Unknown collections and unknown IDs both
    /// yield [`Error::NotFound`].
    pub fn get_item(&self, collection: &str, id: &str) -> Result<Feature> {
        let store = self.store(collection).ok_or(Error::NotFound)?;
        let index = store.index_of(id).ok_or(Error::NotFound)?;
        store.feature(index)?.ok_or(Error::NotFound)
    }

    /// Streams one page of features intersecting `query.bbox` into `out`.
    ///
    /// Matching features are numbered in storage order. The page starts at
    /// the ordinal of `query.start_id` when that ID still exists, otherwise
    /// at `query.start_index`. The trailer carries a self link, a next link
    /// when matches remain, and the union of the emitted bounds.
    ///
    /// An error after the header was written leaves a truncated document in
    /// `out`.
    pub fn get_items<W: Write + ?Sized>(
        &self,
        collection: &str,
        query: &ItemsQuery,
        out: &mut W,
    ) -> Result<CollectionMetadata> {
        let store = self.store(collection).ok_or(Error::NotFound)?;
        let metadata = store.metadata().clone();
        query.preconditions.check(metadata.last_modified)?;

        let limit = query.clamped_limit();
        let bounds = store.bounds();
        let resumed = Some(query.start_id.as_str())
            .filter(|id| !id.is_empty())
            .and_then(|id| store.index_of(id));
        let start = match resumed {
            Some(position) => bounds[..position]
                .iter()
                .filter(|feature_bounds| query.bbox.intersects(feature_bounds))
                .count() as i64,
            None => query.start_index.max(0),
        };
        let end = start.saturating_add(limit);

        let mut writer = FeatureCollectionWriter::begin(out)?;
        let mut emitted = LatLngBounds::empty();
        let mut next = None;
        let mut ordinal = 0i64;
        for (index, feature_bounds) in bounds.iter().enumerate() {
            if !query.bbox.intersects(feature_bounds) {
                continue;
            }
            if ordinal >= end {
                next = Some((store.cursor_id(index).unwrap_or_default(), ordinal));
                break;
            }
            if ordinal >= start {
                if let Some(bytes) = store.feature_bytes(index) {
                    writer.push(bytes)?;
                    emitted = emitted.union(feature_bounds);
                }
            }
            ordinal += 1;
        }

        let mut links = Vec::new();
        if query.include_links {
            let prefix = &self.config.public_path;
            links.push(Link::geojson(
                format_items_url(prefix, collection, &query.start_id, start, limit, &query.bbox),
                "self",
            ));
            if let Some((next_id, next_start)) = next {
                links.push(Link::geojson(
                    format_items_url(prefix, collection, next_id, next_start, limit, &query.bbox),
                    "next",
                ));
            }
        }
        writer.finish(&links, emitted.to_bbox())?;
        Ok(metadata)
    }

    /// PNG tile with one marker per feature whose bounds intersect the
    /// tile.
    pub fn get_tile(&self, collection: &str, tile: TileCoord) -> Result<(Arc<Vec<u8>>, CollectionMetadata)> {
        tile.validate()?;
        let store = self.store(collection).ok_or(Error::NotFound)?;
        let metadata = store.metadata().clone();

        let key = TileKey::new(collection, store.generation(), tile);
        if let Some(cached) = self.tile_cache.as_ref().and_then(|cache| cache.get(&key)) {
            return Ok((cached, metadata));
        }

        let area = tile_bounds(tile);
        let markers: Vec<_> = store
            .bounds()
            .iter()
            .zip(store.centroids())
            .filter(|(feature_bounds, _)| area.intersects(feature_bounds))
            .map(|(_, centroid)| *centroid)
            .collect();
        if markers.is_empty() {
            return Ok((empty_tile()?, metadata));
        }

        // Markers whose centroids fall outside the tile may still leave it blank.
        let data = render_tile(tile, markers)?;
        if let Some(cache) = &self.tile_cache {
            if !Arc::ptr_eq(&data, &empty_tile()?) {
                cache.put(key, Arc::clone(&data));
            }
        }
        Ok((data, metadata))
    }

    /// Streams up to ten features near pixel `(i, j)` of `tile`.
    pub fn get_tile_feature_info<W: Write + ?Sized>(
        &self,
        collection: &str,
        tile: TileCoord,
        i: u32,
        j: u32,
        preconditions: Preconditions,
        out: &mut W,
    ) -> Result<CollectionMetadata> {
        tile.validate()?;
        if i >= TILE_SIZE || j >= TILE_SIZE {
            return Err(Error::MalformedInput(format!(
                "pixel ({i}, {j}) is outside the tile"
            )));
        }

        let query = ItemsQuery::default()
            .with_limit(FEATURE_INFO_LIMIT)
            .with_bbox(pixel_search_area(tile, i, j))
            .with_preconditions(preconditions)
            .with_links(false);
        self.get_items(collection, &query, out)
    }

    /// Reconciles collections with their files for one trigger.
    pub fn handle_trigger(&self, trigger: &ReloadTrigger) {
        match trigger {
            ReloadTrigger::Poll => {
                for metadata in self.list_collections() {
                    self.reload_if_changed(&metadata);
                }
            }
            ReloadTrigger::Changed(path) => {
                if let Some(metadata) = self.collection_for_path(path) {
                    self.reload_if_changed(&metadata);
                }
            }
        }
    }

    /// Reloads a collection if its file changed after
    /// `metadata.last_modified`. Failures keep the active store.
    pub fn reload_if_changed(&self, metadata: &CollectionMetadata) -> ReloadOutcome {
        match FeatureStore::load(&metadata.name, &metadata.path, Some(metadata.last_modified)) {
            Ok(store) => {
                info!(
                    "reloaded collection {} from {}",
                    metadata.name,
                    metadata.path.display()
                );
                self.publish(store);
                ReloadOutcome::Reloaded
            }
            Err(Error::NotModified) => {
                debug!(
                    "no change in collection {} at {}",
                    metadata.name,
                    metadata.path.display()
                );
                ReloadOutcome::Unchanged
            }
            Err(e) => {
                error!(
                    "error reading collection {} at {}: {e}",
                    metadata.name,
                    metadata.path.display()
                );
                self.stats_mut().failures += 1;
                ReloadOutcome::Failed
            }
        }
    }

    /// Collection backed by the file at `path`, if any
    pub fn collection_for_path(&self, path: &Path) -> Option<CollectionMetadata> {
        let collections = self.list_collections();
        if let Some(found) = collections.iter().find(|metadata| metadata.path == path) {
            return Some(found.clone());
        }

        // Watchers may report paths through a different but equivalent route.
        let canonical = std::fs::canonicalize(path).ok()?;
        collections.into_iter().find(|metadata| {
            std::fs::canonicalize(&metadata.path)
                .map(|candidate| candidate == canonical)
                .unwrap_or(false)
        })
    }

    /// Directories that contain collection files, without duplicates
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        let mut directories: Vec<PathBuf> = self
            .list_collections()
            .into_iter()
            .filter_map(|metadata| metadata.path.parent().map(Path::to_path_buf))
            .collect();
        directories.sort();
        directories.dedup();
        directories
    }

    /// Stops the reload loop and releases every store and cached tile.
    ///
    /// Reloads racing with shutdown are discarded. Queries issued afterwards
    /// see no collections.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let reloader = self.reloader().take();
        if let Some(reloader) = reloader {
            reloader.stop();
        }
        let released = std::mem::take(&mut *self.write());
        if let Some(cache) = &self.tile_cache {
            cache.clear();
        }
        info!("shut down index with {} collections", released.len());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn publish(&self, store: FeatureStore) {
        let name = store.metadata().name.clone();
        let previous = {
            let mut collections = self.write();
            if self.is_closed() {
                warn!("discarding load of collection {name} after shutdown");
                return;
            }
            collections.insert(name, Arc::new(store))
        };
        // The superseded store is released outside the lock, or later by
        // the last reader still holding it.
        drop(previous);

        let mut stats = self.stats_mut();
        stats.loads += 1;
        stats.last_load = Some(Utc::now());
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<String, Arc<FeatureStore>>> {
        self.collections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<String, Arc<FeatureStore>>> {
        self.collections.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_mut(&self) -> std::sync::MutexGuard<'_, LoadStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reloader(&self) -> std::sync::MutexGuard<'_, Option<Reloader>> {
        self.reloader.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SpatialIndex {
    fn drop(&mut self) {
        let reloader = self.reloader.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(reloader) = reloader {
            reloader.stop();
        }
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("collections", &self.read().len())
            .field("tile_cache", &self.tile_cache.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Box of [`MAX_SIGNATURE_WIDTH`] pixels centred on pixel `(i, j)`.
fn pixel_search_area(tile: TileCoord, i: u32, j: u32) -> LatLngBounds {
    let half = MAX_SIGNATURE_WIDTH / 2.0;
    let size = f64::from(TILE_SIZE);
    let x = f64::from(tile.x) + f64::from(i) / size;
    let y = f64::from(tile.y) + f64::from(j) / size;
    let north_west = unproject(tile.z, x - half / size, y - half / size);
    let south_east = unproject(tile.z, x + half / size, y + half / size);
    LatLngBounds::new(
        LatInterval::new(south_east.lat, north_west.lat),
        LngInterval::new(
            LatLng::wrap_lng(north_west.lng),
            LatLng::wrap_lng(south_east.lng),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TileCacheConfig;
    use serde_json::{json, Value};
    use std::fs;

    fn write_points(dir: &Path, points: &[(&str, f64, f64)]) -> PathBuf {
        let features: Vec<Value> = points
            .iter()
            .map(|(id, lng, lat)| {
                json!({
                    "type": "Feature",
                    "id": id,
                    "geometry": {"type": "Point", "coordinates": [lng, lat]},
                    "properties": {}
                })
            })
            .collect();
        let path = dir.join("points.geojson");
        fs::write(&path, json!({"type": "FeatureCollection", "features": features}).to_string())
            .unwrap();
        path
    }

    fn index_with(points: &[(&str, f64, f64)]) -> (tempfile::TempDir, SpatialIndex) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), points);
        let index = SpatialIndex::new(IndexConfig::default().with_watch_files(false));
        index.add_collection("points", &path).unwrap();
        (dir, index)
    }

    fn page(index: &SpatialIndex, query: &ItemsQuery) -> Value {
        let mut out = Vec::new();
        index.get_items("points", query, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    fn ids(document: &Value) -> Vec<String> {
        document["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn link(document: &Value, rel: &str) -> Option<String> {
        document["links"]
            .as_array()?
            .iter()
            .find(|l| l["rel"] == rel)
            .map(|l| l["href"].as_str().unwrap().to_string())
    }

    #[test]
    fn test_three_features_two_pages() {
        let (_dir, index) = index_with(&[("A", 1.0, 1.0), ("B", 20.0, 20.0), ("C", 40.0, 40.0)]);

        let first = page(&index, &ItemsQuery::default().with_limit(2));
        assert_eq!(ids(&first), ["A", "B"]);
        assert_eq!(link(&first, "self").unwrap(), "/collections/points/items?limit=2");
        assert_eq!(
            link(&first, "next").unwrap(),
            "/collections/points/items?startID=C&start=2&limit=2"
        );
        assert_eq!(first["bbox"], json!([1.0, 1.0, 20.0, 20.0]));

        let second = page(&index, &ItemsQuery::default().with_limit(2).with_start("C", 2));
        assert_eq!(ids(&second), ["C"]);
        assert!(link(&second, "next").is_none());
    }

    #[test]
    fn test_start_id_with_bbox() {
        let (_dir, index) = index_with(&[
            ("A", 1.0, 1.0),
            ("X", -100.0, -40.0),
            ("B", 2.0, 2.0),
            ("C", 3.0, 3.0),
        ]);
        let bbox = crate::spatial::query::parse_bbox("0,0,10,10").unwrap();
        let query = ItemsQuery::default().with_limit(1).with_bbox(bbox).with_start("B", 0);
        let document = page(&index, &query);
        assert_eq!(ids(&document), ["B"]);
        assert_eq!(
            link(&document, "self").unwrap(),
            "/collections/points/items?startID=B&start=1&limit=1&bbox=0.0000000,0.0000000,10.0000000,10.0000000"
        );
        assert_eq!(
            link(&document, "next").unwrap(),
            "/collections/points/items?startID=C&start=2&limit=1&bbox=0.0000000,0.0000000,10.0000000,10.0000000"
        );
    }

    #[test]
    fn test_no_links_and_empty_result() {
        let (_dir, index) = index_with(&[("A", 1.0, 1.0)]);
        let bbox = crate::spatial::query::parse_bbox("50,50,60,60").unwrap();
        let mut out = Vec::new();
        index
            .get_items("points", &ItemsQuery::default().with_bbox(bbox).with_links(false), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"type":"FeatureCollection","features":[]}"#
        );
    }

    #[test]
    fn test_unknown_collection() {
        let (_dir, index) = index_with(&[("A", 1.0, 1.0)]);
        let mut out = Vec::new();
        assert!(matches!(
            index.get_items("nope", &ItemsQuery::default(), &mut out),
            Err(Error::NotFound)
        ));
        assert!(out.is_empty());
        assert!(matches!(index.get_item("nope", "A"), Err(Error::NotFound)));
        assert!(matches!(index.get_item("points", "Z"), Err(Error::NotFound)));
        assert_eq!(index.get_item("points", "A").unwrap().derived_id().as_deref(), Some("A"));
        assert!(matches!(
            index.get_tile("nope", TileCoord::new(0, 0, 0)),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_tile_validation() {
        let (_dir, index) = index_with(&[("A", 1.0, 1.0)]);
        assert!(matches!(
            index.get_tile("points", TileCoord::new(2, 0, 1)),
            Err(Error::MalformedInput(_))
        ));
        let mut out = Vec::new();
        assert!(matches!(
            index.get_tile_feature_info("points", TileCoord::new(0, 0, 0), 256, 0, Preconditions::default(), &mut out),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_tile_cache_paths() {
        let (_dir, index) = index_with(&[("A", 8.8, 47.2)]);
        let tile = TileCoord::new(0, 0, 0);
        let (first, _) = index.get_tile("points", tile).unwrap();
        let (second, _) = index.get_tile("points", tile).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(index.tile_cache().unwrap().len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), &[("A", 8.8, 47.2)]);
        let uncached = SpatialIndex::new(
            IndexConfig::default()
                .with_watch_files(false)
                .with_tile_cache(TileCacheConfig::disabled()),
        );
        uncached.add_collection("points", &path).unwrap();
        let (bypassed, _) = uncached.get_tile("points", tile).unwrap();
        assert!(uncached.tile_cache().is_none());
        assert_eq!(*bypassed, *first);
    }

    #[test]
    fn test_empty_tile_not_cached() {
        let (_dir, index) = index_with(&[("A", 8.8, 47.2)]);
        let (tile, _) = index.get_tile("points", TileCoord::new(0, 0, 1)).unwrap();
        assert_eq!(*tile, *empty_tile().unwrap());
        assert!(index.tile_cache().unwrap().is_empty());
    }

    #[test]
    fn test_blank_render_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.geojson");
        let line = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "L",
                "geometry": {"type": "LineString", "coordinates": [[-20.0, 1.0], [10.0, 1.0]]},
                "properties": {}
            }]
        });
        fs::write(&path, line.to_string()).unwrap();
        let index = SpatialIndex::new(IndexConfig::default().with_watch_files(false));
        index.add_collection("lines", &path).unwrap();

        // The line crosses this tile but its centroid sits in the tile to the west.
        let tile = TileCoord::new(8, 7, 4);
        assert!(tile_bounds(tile).intersects(&index.store("lines").unwrap().bounds()[0]));
        let (data, _) = index.get_tile("lines", tile).unwrap();
        assert!(Arc::ptr_eq(&data, &empty_tile().unwrap()));
        assert!(index.tile_cache().unwrap().is_empty());
    }

    #[test]
    fn test_next_links_skip_unmatched_features() {
        let (_dir, index) = index_with(&[
            ("A", 1.0, 1.0),
            ("X", -100.0, -40.0),
            ("B", 2.0, 2.0),
            ("Y", 120.0, 30.0),
            ("C", 3.0, 3.0),
            ("D", 4.0, 4.0),
        ]);
        let bbox = crate::spatial::query::parse_bbox("0,0,10,10").unwrap();
        for limit in [1, 2] {
            let mut query = ItemsQuery::default().with_limit(limit).with_bbox(bbox);
            let mut seen = Vec::new();
            loop {
                let document = page(&index, &query);
                seen.extend(ids(&document));
                let Some(href) = link(&document, "next") else { break };
                let params: FxHashMap<&str, &str> = href
                    .split_once('?')
                    .unwrap()
                    .1
                    .split('&')
                    .filter_map(|pair| pair.split_once('='))
                    .collect();
                query = query.with_start(params["startID"], params["start"].parse().unwrap());
            }
            assert_eq!(seen, ["A", "B", "C", "D"], "limit {limit}");
        }
    }

    #[test]
    fn test_feature_info() {
        let (_dir, index) = index_with(&[("A", 8.8, 47.2), ("B", -70.0, -30.0)]);
        let tile = TileCoord::new(0, 0, 0);
        let pixel = crate::core::projection::project(LatLng::new(47.2, 8.8));
        let mut out = Vec::new();
        index
            .get_tile_feature_info(
                "points",
                tile,
                pixel.x as u32,
                pixel.y as u32,
                Preconditions::default(),
                &mut out,
            )
            .unwrap();
        let document: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(ids(&document), ["A"]);
        assert!(document.get("links").is_none());
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let (_dir, index) = index_with(&[("A", 1.0, 1.0)]);
        let store = index.store("points").unwrap();
        index.shutdown();
        assert!(index.is_closed());
        assert!(index.list_collections().is_empty());
        assert_eq!(Arc::strong_count(&store), 1);
        assert!(matches!(index.get_item("points", "A"), Err(Error::NotFound)));

        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), &[("B", 2.0, 2.0)]);
        index.add_collection("late", &path).unwrap();
        assert!(index.store("late").is_none());
    }

    #[test]
    fn test_watched_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_points(dir.path(), &[("A", 1.0, 1.0)]);
        let index = SpatialIndex::new(IndexConfig::default().with_watch_files(false));
        index.add_collection("one", &path).unwrap();
        index.add_collection("two", &path).unwrap();
        assert_eq!(index.watched_directories().len(), 1);

        let found = index.collection_for_path(&path.canonicalize().unwrap()).unwrap();
        assert!(found.name == "one" || found.name == "two");
        assert!(index
            .collection_for_path(Path::new("/nonexistent/points.geojson"))
            .is_none());
    }
}
