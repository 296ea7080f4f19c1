use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::core::config::TileCacheConfig;
use crate::core::constants::TILE_CACHE_SHARDS;
use crate::core::geo::TileCoord;

/// Cache key of one rendered tile.
///
/// The store generation is part of the key, so tiles rendered from a
/// superseded snapshot are never served after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub collection: String,
    pub generation: u64,
    pub tile: TileCoord,
}

impl TileKey {
    pub fn new(collection: impl Into<String>, generation: u64, tile: TileCoord) -> Self {
        Self {
            collection: collection.into(),
            generation,
            tile,
        }
    }
}

/// Sharded, approximately LRU cache of encoded tiles.
///
/// Each shard keeps its own lock and recency list. The size counter is
/// global; when it exceeds the capacity the shard that was just written to
/// evicts its own least recently used entry.
#[derive(Debug)]
pub struct TileCache {
    shards: Vec<Mutex<LruCache<TileKey, Arc<Vec<u8>>>>>,
    size: AtomicUsize,
    capacity: usize,
}

impl TileCache {
    /// Create a cache holding roughly `capacity` tiles
    pub fn new(capacity: usize) -> Self {
        Self::with_shards(capacity, TILE_CACHE_SHARDS)
    }

    pub fn with_shards(capacity: usize, shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(LruCache::unbounded()))
            .collect();
        Self {
            shards,
            size: AtomicUsize::new(0),
            capacity,
        }
    }

    /// `None` when the configuration disables caching
    pub fn from_config(config: &TileCacheConfig) -> Option<Self> {
        config
            .is_enabled()
            .then(|| Self::with_shards(config.capacity, config.shards))
    }

    fn shard(&self, key: &TileKey) -> MutexGuard<'_, LruCache<TileKey, Arc<Vec<u8>>>> {
        let index = (fxhash::hash64(key) % self.shards.len() as u64) as usize;
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a tile, marking it as most recently used within its shard
    pub fn get(&self, key: &TileKey) -> Option<Arc<Vec<u8>>> {
        self.shard(key).get(key).cloned()
    }

    /// Insert or update a tile
    pub fn put(&self, key: TileKey, tile: Arc<Vec<u8>>) {
        let mut shard = self.shard(&key);
        if shard.put(key, tile).is_some() {
            return;
        }

        let size = self.size.fetch_add(1, Ordering::AcqRel) + 1;
        // A shard holding only the new entry has nothing older to give up.
        if size > self.capacity && shard.len() > 1 && shard.pop_lru().is_some() {
            self.size.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.shard(key).contains(key)
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap_or_else(PoisonError::into_inner);
            self.size.fetch_sub(shard.len(), Ordering::AcqRel);
            shard.clear();
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_TILE_CACHE_CAPACITY)
    }
}
