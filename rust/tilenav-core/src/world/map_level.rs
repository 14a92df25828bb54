//! Map-to-map adjacency built from the cross-map edges of every map graph.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use tracing::debug;

use crate::graph::map_graph::MapGraph;
use crate::models::{Blocked, Capability, MapId, Node};
use crate::options::TraversalPreferences;

/// One tile-level edge backing a map-level link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkEdge {
    pub from: Node,
    pub to: Node,
    pub gate: Option<Capability>,
}

#[derive(Clone, Debug, Default)]
pub struct MapLevelGraph {
    links: BTreeMap<MapId, BTreeMap<MapId, Vec<LinkEdge>>>,
}

impl MapLevelGraph {
    pub fn from_graphs<'g, I>(graphs: I) -> Self
    where
        I: IntoIterator<Item = &'g MapGraph>,
    {
        let mut links: BTreeMap<MapId, BTreeMap<MapId, Vec<LinkEdge>>> = BTreeMap::new();
        for g in graphs {
            let out = links.entry(g.map_id().clone()).or_default();
            for e in g.exits() {
                out.entry(e.to.map.clone()).or_default().push(LinkEdge { from: e.from, to: e.to, gate: e.gate });
            }
        }
        Self { links }
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(BTreeMap::len).sum()
    }

    pub fn edges(&self, from: &MapId, to: &MapId) -> &[LinkEdge] {
        self.links.get(from).and_then(|m| m.get(to)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A link is usable when any of its underlying edges is.
    pub fn usable(&self, from: &MapId, to: &MapId, prefs: &TraversalPreferences) -> bool {
        self.edges(from, to).iter().any(|e| prefs.allows(e.gate))
    }

    /// Simple map sequences from `from` to `to`, fewest hops first and then
    /// in lexicographic order, at most `max_routes` of them. When `from == to`
    /// the one-map route comes first, followed by round trips through other
    /// maps.
    pub fn candidate_routes(
        &self,
        from: &MapId,
        to: &MapId,
        prefs: &TraversalPreferences,
        max_routes: usize,
        max_expansions: u64,
    ) -> Vec<Vec<MapId>> {
        let mut routes = Vec::new();
        let mut open = BinaryHeap::new();
        let mut expanded: u64 = 0;
        open.push(Reverse((0usize, vec![from.clone()])));

        while let Some(Reverse((hops, path))) = open.pop() {
            if routes.len() >= max_routes || expanded >= max_expansions {
                break;
            }
            expanded += 1;
            let Some(last) = path.last() else { continue };
            if last == to {
                let trivial = path.len() == 1;
                routes.push(path.clone());
                // A same-map trip may still need to leave and come back.
                if !trivial {
                    continue;
                }
            }
            let Some(out) = self.links.get(last) else { continue };
            for next in out.keys() {
                // `to` may close the route even when it is also the start.
                if (next != to && path.contains(next)) || !self.usable(last, next, prefs) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next.clone());
                open.push(Reverse((hops + 1, extended)));
            }
        }

        debug!(from = %from, to = %to, routes = routes.len(), expanded, "map routes enumerated");
        routes
    }

    /// First transition along `route` that `prefs` cannot take, reported at
    /// the tile it lands on.
    pub fn first_locked_link(&self, route: &[MapId], prefs: &TraversalPreferences) -> Option<Blocked> {
        for pair in route.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if self.usable(a, b, prefs) {
                continue;
            }
            return self.edges(a, b).iter().find_map(|e| match e.gate {
                Some(c) if !prefs.has(c) => Some(Blocked { capability: c, at: e.to.clone() }),
                _ => None,
            });
        }
        None
    }
}
