//! Read-only map data access.
//!
//! `MapStore` validates every map reference when it is constructed or
//! reloaded, so searches never encounter dangling warps or connections.
//! Readers go through an `ArcSwap` and never block; `reload` swaps the whole
//! table atomically.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::errors::{NavError, Result};
use crate::models::{Map, MapId};
use crate::tile::TileModel;

pub trait MapDataProvider: Send + Sync {
    fn map(&self, id: &MapId) -> Option<Arc<Map>>;

    /// All known map ids in ascending order.
    fn map_ids(&self) -> Vec<MapId>;
}

pub type MapTable = BTreeMap<MapId, Arc<Map>>;

pub struct MapStore {
    maps: ArcSwap<MapTable>,
}

impl MapStore {
    pub fn new<I>(maps: I) -> Result<Self>
    where
        I: IntoIterator<Item = Map>,
    {
        let table = collect_table(maps)?;
        validate_world(&table)?;
        info!(maps = table.len(), "map store loaded");
        Ok(Self { maps: ArcSwap::from_pointee(table) })
    }

    /// Replaces every map. The old table stays in place if validation fails.
    pub fn reload<I>(&self, maps: I) -> Result<()>
    where
        I: IntoIterator<Item = Map>,
    {
        let table = collect_table(maps)?;
        validate_world(&table)?;
        info!(maps = table.len(), "map store reloaded");
        self.maps.store(Arc::new(table));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.maps.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.load().is_empty()
    }
}

impl MapDataProvider for MapStore {
    fn map(&self, id: &MapId) -> Option<Arc<Map>> {
        self.maps.load().get(id).cloned()
    }

    fn map_ids(&self) -> Vec<MapId> {
        self.maps.load().keys().cloned().collect()
    }
}

fn collect_table<I>(maps: I) -> Result<MapTable>
where
    I: IntoIterator<Item = Map>,
{
    let mut table = MapTable::new();
    for m in maps {
        let id = m.id.clone();
        if table.insert(id.clone(), Arc::new(m)).is_some() {
            return Err(NavError::invalid_data(&id, "duplicate map id"));
        }
    }
    Ok(table)
}

/// Checks terrain shape and codes, plus every warp, connection, observer and
/// point of interest reference.
pub fn validate_world(maps: &MapTable) -> Result<()> {
    for map in maps.values() {
        validate_map(map, maps)?;
    }
    Ok(())
}

fn validate_map(map: &Map, maps: &MapTable) -> Result<()> {
    let id = &map.id;
    if map.width == 0 || map.height == 0 {
        return Err(NavError::invalid_data(id, "map has zero width or height"));
    }
    if map.terrain.len() != map.height as usize {
        return Err(NavError::invalid_data(
            id,
            format!("expected {} terrain rows, found {}", map.height, map.terrain.len()),
        ));
    }
    for (y, row) in map.terrain.iter().enumerate() {
        if row.len() != map.width as usize {
            return Err(NavError::invalid_data(
                id,
                format!("terrain row {} has {} codes, expected {}", y, row.len(), map.width),
            ));
        }
        for x in 0..map.width as i32 {
            TileModel::classify_at(map, x, y as i32)?;
        }
    }

    for w in &map.warps {
        if !map.in_bounds(w.x, w.y) {
            return Err(NavError::invalid_data(id, format!("warp source ({}, {}) out of bounds", w.x, w.y)));
        }
        let target = maps
            .get(&w.target)
            .ok_or_else(|| NavError::invalid_data(id, format!("warp at ({}, {}) targets unknown map {}", w.x, w.y, w.target)))?;
        if !target.in_bounds(w.target_x, w.target_y) {
            return Err(NavError::invalid_data(
                id,
                format!("warp at ({}, {}) targets ({}, {}) outside {}", w.x, w.y, w.target_x, w.target_y, w.target),
            ));
        }
    }

    for c in &map.connections {
        if !maps.contains_key(&c.target) {
            return Err(NavError::invalid_data(id, format!("{} connection targets unknown map {}", c.direction, c.target)));
        }
    }

    for o in &map.observers {
        if !map.in_bounds(o.x, o.y) {
            return Err(NavError::invalid_data(id, format!("observer {} at ({}, {}) out of bounds", o.id, o.x, o.y)));
        }
    }
    for p in &map.points_of_interest {
        if !map.in_bounds(p.x, p.y) {
            return Err(NavError::invalid_data(id, format!("point of interest at ({}, {}) out of bounds", p.x, p.y)));
        }
    }
    Ok(())
}
