//! Observer line-of-sight.
//!
//! Each observer watches a straight ray of tiles in its facing direction,
//! starting one tile in front of it. The ray ends early at the first
//! out-of-bounds tile or at terrain that blocks sight.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::map_graph::MapGraph;
use crate::models::{Observer, ObserverId};

/// Watched tiles of one map and the observers watching each of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisionZone {
    watched: BTreeMap<(i32, i32), BTreeSet<ObserverId>>,
}

impl VisionZone {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_watched(&self, x: i32, y: i32) -> bool {
        self.watched.contains_key(&(x, y))
    }

    pub fn observers_at(&self, x: i32, y: i32) -> Option<&BTreeSet<ObserverId>> {
        self.watched.get(&(x, y))
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Watched tiles in `(y, x)` order.
    pub fn tiles(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let mut keys: Vec<(i32, i32)> = self.watched.keys().copied().collect();
        keys.sort_by_key(|&(x, y)| (y, x));
        keys.into_iter()
    }

    fn watch(&mut self, x: i32, y: i32, id: ObserverId) {
        self.watched.entry((x, y)).or_default().insert(id);
    }
}

pub struct VisionZoneCalculator;

impl VisionZoneCalculator {
    pub fn compute(graph: &MapGraph, observers: &[Observer]) -> VisionZone {
        let mut zone = VisionZone::empty();
        for obs in observers.iter().filter(|o| !o.defeated) {
            let (mut x, mut y) = (obs.x, obs.y);
            for _ in 0..obs.range {
                (x, y) = obs.facing.step(x, y);
                match graph.classification(x, y) {
                    Ok(class) if !class.blocks_sight() => zone.watch(x, y, obs.id),
                    _ => break,
                }
            }
        }
        zone
    }

    /// Zone produced by the observers stored on the graph's own map.
    pub fn for_map(graph: &MapGraph) -> VisionZone {
        Self::compute(graph, &graph.map().observers)
    }
}
