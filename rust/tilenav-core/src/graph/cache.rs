//! Per-map graph cache with LRU eviction.
//! Thread-safe via Mutex; entries are revalidated against a fingerprint of the
//! map's static data, so a reloaded map is rebuilt on its next lookup.

use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use rustc_hash::FxHasher;
use tracing::debug;

use crate::config::DEFAULT_GRAPH_CACHE_CAPACITY;
use crate::errors::{NavError, Result};
use crate::graph::map_graph::MapGraph;
use crate::models::{Map, MapId};
use crate::tile::TileModel;
use crate::world::provider::MapDataProvider;

/// Hash of everything `MapGraph::build` reads: the map itself plus the static
/// data of every map it connects or warps into.
pub fn static_fingerprint(map: &Map, provider: &dyn MapDataProvider) -> u64 {
    let mut h = FxHasher::default();
    map.hash_static(&mut h);
    let linked = map.connections.iter().map(|c| &c.target).chain(map.warps.iter().map(|w| &w.target));
    for id in linked {
        match provider.map(id) {
            Some(m) => m.hash_static(&mut h),
            None => h.write_u8(0),
        }
    }
    h.finish()
}

pub struct GraphCache {
    capacity: usize,
    inner: Mutex<LruCache<MapId, (u64, Arc<MapGraph>)>>,
}

impl GraphCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.max(1);
        let cap_nz = NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::MIN);
        Self { capacity: cap, inner: Mutex::new(LruCache::new(cap_nz)) }
    }

    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_GRAPH_CACHE_CAPACITY)
    }

    /// Returns the cached graph for `id`, building it if absent or stale.
    pub fn get_or_build(&self, id: &MapId, provider: &dyn MapDataProvider, model: &TileModel) -> Result<Arc<MapGraph>> {
        let map = provider.map(id).ok_or_else(|| NavError::UnknownMap(id.clone()))?;
        let fp = static_fingerprint(&map, provider);

        if let Some(hit) = self.lookup(id, fp) {
            return Ok(hit);
        }

        // Miss: build outside the lock
        let graph = Arc::new(MapGraph::build(map, provider, model)?);
        debug!(map = %id, nodes = graph.node_count(), edges = graph.edge_count(), "built map graph");

        let mut guard = self.inner.lock().expect("graph cache mutex poisoned");
        if let Some((existing_fp, existing)) = guard.get(id) {
            if *existing_fp == fp {
                return Ok(Arc::clone(existing));
            }
        }
        guard.put(id.clone(), (fp, Arc::clone(&graph)));
        Ok(graph)
    }

    fn lookup(&self, id: &MapId, fp: u64) -> Option<Arc<MapGraph>> {
        let mut guard = self.inner.lock().ok()?;
        match guard.get(id) {
            Some((cached_fp, g)) if *cached_fp == fp => Some(Arc::clone(g)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.clear();
        }
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new()
    }
}

// Prove Send + Sync bounds for compile-time safety.
#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert_bound<T: Send + Sync>() {}
    assert_bound::<GraphCache>();
}
