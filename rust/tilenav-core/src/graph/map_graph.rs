use std::sync::Arc;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{NavError, Result};
use crate::graph::movement::{Direction, DIRECTION_ORDER};
use crate::models::{Capability, Map, MapId, MoveToken, Node};
use crate::tile::{TileClassification, TileModel};
use crate::world::provider::MapDataProvider;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Directionality {
    Bidirectional,
    OneWay,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Step(Direction),
    Connection(Direction),
    Warp,
}

impl EdgeKind {
    pub fn token(self) -> MoveToken {
        match self {
            EdgeKind::Step(d) | EdgeKind::Connection(d) => d.into(),
            EdgeKind::Warp => MoveToken::Interact,
        }
    }

    pub fn crosses_maps(self) -> bool {
        !matches!(self, EdgeKind::Step(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
    pub base_cost: f64,
    pub directionality: Directionality,
    pub gate: Option<Capability>,
    pub kind: EdgeKind,
    /// Classification of the destination tile.
    pub terrain: TileClassification,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    Local(usize),
    Foreign(Node),
}

#[derive(Clone, Debug)]
pub(crate) struct GraphEdge {
    pub(crate) target: Target,
    pub(crate) kind: EdgeKind,
    pub(crate) terrain: TileClassification,
    pub(crate) directionality: Directionality,
    pub(crate) base_cost: f64,
}

impl GraphEdge {
    pub(crate) fn target_node(&self) -> Option<&Node> {
        match &self.target {
            Target::Foreign(n) => Some(n),
            Target::Local(_) => None,
        }
    }

    pub(crate) fn gate(&self) -> Option<Capability> {
        match self.kind {
            EdgeKind::Warp => None,
            _ => self.terrain.gate(),
        }
    }
}

/// Traversal graph of one map. Tiles are indexed row-major; edges leaving the
/// map point at foreign nodes and are never expanded further here.
#[derive(Debug)]
pub struct MapGraph {
    map: Arc<Map>,
    width: i32,
    height: i32,
    terrain: Vec<TileClassification>,
    adjacency: Vec<Vec<GraphEdge>>,
    interactions: BitVec,
    // Set when a warp or connection lands back in this map.
    local_teleports: bool,
}

impl MapGraph {
    pub fn build(map: Arc<Map>, provider: &dyn MapDataProvider, model: &TileModel) -> Result<Self> {
        let width = map.width as i32;
        let height = map.height as i32;
        if map.terrain.len() != map.height as usize {
            return Err(NavError::invalid_data(&map.id, "terrain row count does not match height"));
        }

        let mut terrain = Vec::with_capacity(map.tile_count());
        for y in 0..height {
            for x in 0..width {
                terrain.push(TileModel::classify_at(&map, x, y)?);
            }
        }

        let mut graph = MapGraph {
            adjacency: vec![Vec::new(); terrain.len()],
            interactions: bitvec![0; terrain.len()],
            map,
            width,
            height,
            terrain,
            local_teleports: false,
        };
        graph.add_steps(model);
        graph.add_connections(provider, model)?;
        graph.add_warps(provider, model)?;
        graph.mark_interactions();
        Ok(graph)
    }

    fn add_steps(&mut self, model: &TileModel) {
        for idx in 0..self.terrain.len() {
            let (x, y) = self.coords(idx);
            let dirs: &[Direction] = match self.terrain[idx] {
                TileClassification::Wall => &[],
                TileClassification::OneWayDrop(d) => match d {
                    Direction::Up => &[Direction::Up],
                    Direction::Down => &[Direction::Down],
                    Direction::Left => &[Direction::Left],
                    Direction::Right => &[Direction::Right],
                },
                _ => &DIRECTION_ORDER,
            };
            for &dir in dirs {
                let (nx, ny) = dir.step(x, y);
                let Some(n) = self.index_of(nx, ny) else { continue };
                let dest = self.terrain[n];
                if !dest.admits_entry(dir) {
                    continue;
                }
                let one_way = matches!(self.terrain[idx], TileClassification::OneWayDrop(_))
                    || matches!(dest, TileClassification::OneWayDrop(_));
                self.adjacency[idx].push(GraphEdge {
                    target: Target::Local(n),
                    kind: EdgeKind::Step(dir),
                    terrain: dest,
                    directionality: if one_way { Directionality::OneWay } else { Directionality::Bidirectional },
                    base_cost: model.base_cost(dest),
                });
            }
        }
    }

    fn add_connections(&mut self, provider: &dyn MapDataProvider, model: &TileModel) -> Result<()> {
        let map = Arc::clone(&self.map);
        for conn in &map.connections {
            let target = provider.map(&conn.target).ok_or_else(|| {
                NavError::invalid_data(&map.id, format!("{} connection targets unknown map {}", conn.direction, conn.target))
            })?;
            let (tw, th) = (target.width as i32, target.height as i32);
            // Boundary tiles on this side, paired with the tile they continue to.
            let pairs: Vec<((i32, i32), (i32, i32))> = match conn.direction {
                Direction::Up => (0..self.width).map(|x| ((x, 0), (x - conn.offset, th - 1))).collect(),
                Direction::Down => (0..self.width).map(|x| ((x, self.height - 1), (x - conn.offset, 0))).collect(),
                Direction::Left => (0..self.height).map(|y| ((0, y), (tw - 1, y - conn.offset))).collect(),
                Direction::Right => (0..self.height).map(|y| ((self.width - 1, y), (0, y - conn.offset))).collect(),
            };
            for ((sx, sy), (tx, ty)) in pairs {
                let Some(src) = self.index_of(sx, sy) else { continue };
                let leaves = match self.terrain[src] {
                    TileClassification::Wall => false,
                    TileClassification::OneWayDrop(d) => d == conn.direction,
                    _ => true,
                };
                if !leaves || !target.in_bounds(tx, ty) {
                    continue;
                }
                let dest = TileModel::classify_at(&target, tx, ty)?;
                if !dest.admits_entry(conn.direction) {
                    continue;
                }
                let target = self.resolve(target.node(tx, ty));
                self.adjacency[src].push(GraphEdge {
                    target,
                    kind: EdgeKind::Connection(conn.direction),
                    terrain: dest,
                    directionality: if conn.one_way { Directionality::OneWay } else { Directionality::Bidirectional },
                    base_cost: model.base_cost(dest),
                });
            }
        }
        Ok(())
    }

    fn add_warps(&mut self, provider: &dyn MapDataProvider, model: &TileModel) -> Result<()> {
        let map = Arc::clone(&self.map);
        for warp in &map.warps {
            let src = self.index_of(warp.x, warp.y).ok_or_else(|| {
                NavError::invalid_data(&map.id, format!("warp source ({}, {}) out of bounds", warp.x, warp.y))
            })?;
            let target = provider
                .map(&warp.target)
                .ok_or_else(|| NavError::invalid_data(&map.id, format!("warp targets unknown map {}", warp.target)))?;
            if !target.in_bounds(warp.target_x, warp.target_y) {
                return Err(NavError::invalid_data(
                    &map.id,
                    format!("warp at ({}, {}) lands outside {}", warp.x, warp.y, warp.target),
                ));
            }
            let paired = target
                .warps
                .iter()
                .any(|back| back.target == map.id && back.target_x == warp.x && back.target_y == warp.y);
            let dest = self.resolve(target.node(warp.target_x, warp.target_y));
            self.adjacency[src].push(GraphEdge {
                target: dest,
                kind: EdgeKind::Warp,
                terrain: TileClassification::Boundary,
                directionality: if paired { Directionality::Bidirectional } else { Directionality::OneWay },
                base_cost: model.costs().interaction_cost,
            });
        }
        Ok(())
    }

    fn resolve(&mut self, node: Node) -> Target {
        if node.map == self.map.id {
            if let Some(idx) = self.index_of(node.x, node.y) {
                self.local_teleports = true;
                return Target::Local(idx);
            }
        }
        Target::Foreign(node)
    }

    fn mark_interactions(&mut self) {
        let map = Arc::clone(&self.map);
        let tiles = map.warps.iter().map(|w| (w.x, w.y)).chain(map.points_of_interest.iter().map(|p| (p.x, p.y)));
        for (x, y) in tiles {
            if let Some(idx) = self.index_of(x, y) {
                self.interactions.set(idx, true);
            }
        }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_id(&self) -> &MapId {
        &self.map.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// True when some edge jumps within this map, which makes the Manhattan
    /// distance unusable as a lower bound.
    pub fn has_local_teleports(&self) -> bool {
        self.local_teleports
    }

    pub fn node_count(&self) -> usize {
        self.terrain.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    #[inline]
    pub(crate) fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    #[inline]
    pub(crate) fn coords(&self, idx: usize) -> (i32, i32) {
        let idx = idx as i32;
        (idx % self.width, idx / self.width)
    }

    pub(crate) fn edges_from(&self, idx: usize) -> &[GraphEdge] {
        &self.adjacency[idx]
    }

    /// Index of `node` in this graph, or `InvalidTile` if it lies elsewhere.
    pub(crate) fn require_local(&self, node: &Node) -> Result<usize> {
        if node.map != self.map.id {
            return Err(NavError::InvalidTile { map: node.map.clone(), x: node.x, y: node.y });
        }
        self.index_of(node.x, node.y)
            .ok_or_else(|| NavError::InvalidTile { map: node.map.clone(), x: node.x, y: node.y })
    }

    pub fn classification(&self, x: i32, y: i32) -> Result<TileClassification> {
        self.index_of(x, y)
            .map(|i| self.terrain[i])
            .ok_or_else(|| NavError::InvalidTile { map: self.map.id.clone(), x, y })
    }

    /// Arriving on a warp or point-of-interest tile ends with an interaction.
    pub fn requires_interaction(&self, x: i32, y: i32) -> bool {
        self.index_of(x, y).map(|i| self.interactions[i]).unwrap_or(false)
    }

    pub fn neighbors(&self, node: &Node) -> Result<Vec<Edge>> {
        let idx = self.require_local(node)?;
        Ok(self.adjacency[idx].iter().map(|e| self.to_edge(idx, e)).collect())
    }

    /// Every edge leaving this map, ordered by source `(y, x)` then target.
    pub fn exits(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        for (idx, edges) in self.adjacency.iter().enumerate() {
            for e in edges.iter().filter(|e| matches!(e.target, Target::Foreign(_))) {
                out.push(self.to_edge(idx, e));
            }
        }
        out.sort_by(|a, b| (a.from.y, a.from.x, &a.to).cmp(&(b.from.y, b.from.x, &b.to)));
        out
    }

    /// Edges from this map into `map`, with their source index, ordered by
    /// source `(y, x)` then target.
    pub(crate) fn exits_to(&self, map: &MapId) -> Vec<(usize, &GraphEdge)> {
        let mut out: Vec<(usize, &GraphEdge)> = Vec::new();
        for (idx, edges) in self.adjacency.iter().enumerate() {
            for e in edges {
                if matches!(&e.target, Target::Foreign(n) if &n.map == map) {
                    out.push((idx, e));
                }
            }
        }
        // row-major indices already sort by (y, x)
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.target_node().cmp(&b.1.target_node())));
        out
    }

    pub(crate) fn node_at(&self, idx: usize) -> Node {
        let (x, y) = self.coords(idx);
        self.map.node(x, y)
    }

    fn to_edge(&self, from: usize, e: &GraphEdge) -> Edge {
        let to = match &e.target {
            Target::Local(i) => self.node_at(*i),
            Target::Foreign(n) => n.clone(),
        };
        Edge {
            from: self.node_at(from),
            to,
            base_cost: e.base_cost,
            directionality: e.directionality,
            gate: e.gate(),
            kind: e.kind,
            terrain: e.terrain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, Warp};
    use crate::world::provider::MapStore;

    fn map(id: &str, rows: &[&str]) -> Map {
        Map {
            id: id.into(),
            width: rows[0].len() as u32,
            height: rows.len() as u32,
            tileset: 0,
            terrain: rows.iter().map(|r| r.to_string()).collect(),
            connections: vec![],
            warps: vec![],
            observers: vec![],
            points_of_interest: vec![],
        }
    }

    fn build(maps: Vec<Map>, id: &str) -> MapGraph {
        let store = MapStore::new(maps).unwrap();
        let m = store.map(&id.into()).unwrap();
        MapGraph::build(m, &store, &TileModel::default()).unwrap()
    }

    fn targets(g: &MapGraph, x: i32, y: i32) -> Vec<(i32, i32)> {
        g.neighbors(&Node::new(g.map_id().clone(), x, y)).unwrap().iter().map(|e| (e.to.x, e.to.y)).collect()
    }

    #[test]
    fn open_tile_has_four_neighbors_in_fixed_order() {
        let g = build(vec![map("A", &["...", "...", "..."])], "A");
        assert_eq!(targets(&g, 1, 1), vec![(1, 0), (1, 2), (0, 1), (2, 1)]);
        assert_eq!(targets(&g, 0, 0), vec![(0, 1), (1, 0)]);
        assert_eq!(g.node_count(), 9);
    }

    #[test]
    fn walls_have_no_edges_in_or_out() {
        let g = build(vec![map("A", &[".#."])], "A");
        assert!(targets(&g, 1, 0).is_empty());
        assert!(targets(&g, 0, 0).is_empty());
        assert!(targets(&g, 2, 0).is_empty());
    }

    #[test]
    fn ledge_has_single_outgoing_edge_and_no_reverse() {
        // (1,1) drops down onto (1,2)
        let g = build(vec![map("A", &["...", ".v.", "..."])], "A");
        let out = g.neighbors(&Node::new("A", 1, 1)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].to.x, out[0].to.y), (1, 2));
        assert_eq!(out[0].directionality, Directionality::OneWay);

        // only the tile above may step onto the ledge
        assert!(targets(&g, 1, 0).contains(&(1, 1)));
        assert!(!targets(&g, 1, 2).contains(&(1, 1)));
        assert!(!targets(&g, 0, 1).contains(&(1, 1)));
        assert!(!targets(&g, 2, 1).contains(&(1, 1)));
    }

    #[test]
    fn one_way_edges_never_appear_in_both_directions() {
        let g = build(vec![map("A", &["..,..", ".v>..", "~~...", "..<^."])], "A");
        for y in 0..g.height() {
            for x in 0..g.width() {
                for e in g.neighbors(&Node::new("A", x, y)).unwrap() {
                    if e.directionality != Directionality::OneWay {
                        continue;
                    }
                    let back = g.neighbors(&e.to).unwrap();
                    assert!(!back.iter().any(|b| b.to == e.from), "reverse of one-way edge {:?}", e);
                }
            }
        }
    }

    #[test]
    fn gated_destinations_carry_their_gate() {
        let g = build(vec![map("A", &[".~T"])], "A");
        let from_open = g.neighbors(&Node::new("A", 0, 0)).unwrap();
        assert_eq!(from_open[0].gate, Some(Capability::WaterCrossing));
        let from_water = g.neighbors(&Node::new("A", 1, 0)).unwrap();
        let gates: Vec<_> = from_water.iter().map(|e| e.gate).collect();
        assert_eq!(gates, vec![None, Some(Capability::Cut)]);
    }

    #[test]
    fn connections_and_warps_create_cross_map_edges() {
        let mut a = map("A", &["...", "...", ".D."]);
        a.connections.push(Connection { direction: Direction::Right, target: "B".into(), offset: 1, one_way: false });
        a.warps.push(Warp { x: 1, y: 2, target: "C".into(), target_x: 0, target_y: 0 });
        let b = map("B", &["..", "..", ".."]);
        let c = map("C", &["D"]);
        let g = build(vec![a, b, c], "A");

        let exits = g.exits();
        // right edge x=2: y=0 -> B(0,-1) is out of bounds, y=1 -> B(0,0), y=2 -> B(0,1)
        let conns: Vec<_> = exits.iter().filter(|e| matches!(e.kind, EdgeKind::Connection(_))).collect();
        assert_eq!(conns.len(), 2);
        assert_eq!(conns[0].from, Node::new("A", 2, 1));
        assert_eq!(conns[0].to, Node::new("B", 0, 0));

        let warp = exits.iter().find(|e| e.kind == EdgeKind::Warp).unwrap();
        assert_eq!(warp.to, Node::new("C", 0, 0));
        assert_eq!(warp.directionality, Directionality::OneWay);
        assert!(g.requires_interaction(1, 2));
        assert!(!g.requires_interaction(0, 0));
    }

    #[test]
    fn same_map_warp_stays_local() {
        let mut a = map("A", &["....."]);
        a.warps.push(Warp { x: 0, y: 0, target: "A".into(), target_x: 4, target_y: 0 });
        let g = build(vec![a], "A");
        assert!(g.has_local_teleports());
        assert!(g.exits().is_empty());
        assert!(targets(&g, 0, 0).contains(&(4, 0)));
    }

    #[test]
    fn neighbors_rejects_foreign_or_out_of_bounds_nodes() {
        let g = build(vec![map("A", &[".."]), map("B", &[".."])], "A");
        assert!(matches!(g.neighbors(&Node::new("A", 5, 0)), Err(NavError::InvalidTile { .. })));
        assert!(matches!(g.neighbors(&Node::new("B", 0, 0)), Err(NavError::InvalidTile { .. })));
    }

    #[test]
    fn build_is_deterministic() {
        let rows = [".,~.", "#v..", "..T."];
        let g1 = build(vec![map("A", &rows)], "A");
        let g2 = build(vec![map("A", &rows)], "A");
        for y in 0..3 {
            for x in 0..4 {
                let n = Node::new("A", x, y);
                assert_eq!(g1.neighbors(&n).unwrap(), g2.neighbors(&n).unwrap());
            }
        }
    }
}
