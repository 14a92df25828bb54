//! Multi-map routing: pick a map sequence, then stitch one A* segment per map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use itertools::Itertools;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, info, warn};

use crate::astar::{AStar, Finish, SearchOutcome};
use crate::config::EngineConfig;
use crate::errors::{NavError, Result};
use crate::graph::cache::{static_fingerprint, GraphCache};
use crate::graph::map_graph::MapGraph;
use crate::models::{Blocked, MapId, Node, NotFound, Observer, PathResult, PathSegment, RouteOutcome};
use crate::options::TraversalPreferences;
use crate::tile::TileModel;
use crate::vision::{VisionZone, VisionZoneCalculator};
use crate::world::map_level::MapLevelGraph;
use crate::world::provider::MapDataProvider;

/// Per-map observer lists that replace the ones stored on the maps.
pub type ObserverSnapshot = BTreeMap<MapId, Vec<Observer>>;

/// Destination of a route: a specific tile, or anywhere inside a map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteTarget {
    Tile(Node),
    Map(MapId),
}

impl RouteTarget {
    pub fn map(&self) -> &MapId {
        match self {
            RouteTarget::Tile(n) => &n.map,
            RouteTarget::Map(m) => m,
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Tile(n) => n.fmt(f),
            RouteTarget::Map(m) => m.fmt(f),
        }
    }
}

impl From<Node> for RouteTarget {
    fn from(n: Node) -> Self {
        RouteTarget::Tile(n)
    }
}

impl From<MapId> for RouteTarget {
    fn from(m: MapId) -> Self {
        RouteTarget::Map(m)
    }
}

struct LevelEntry {
    fingerprint: u64,
    graph: Arc<MapLevelGraph>,
}

enum Legs {
    Found(Vec<(PathSegment, Node)>),
    Failed(RouteOutcome),
}

pub struct WorldRouter {
    provider: Arc<dyn MapDataProvider>,
    config: EngineConfig,
    model: TileModel,
    cache: GraphCache,
    level: ArcSwapOption<LevelEntry>,
}

impl WorldRouter {
    /// Fails with [`NavError::InvalidConfig`] when `config` carries a
    /// non-positive or non-finite cost.
    pub fn new(provider: Arc<dyn MapDataProvider>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(provider, config))
    }

    pub fn with_defaults(provider: Arc<dyn MapDataProvider>) -> Self {
        Self::assemble(provider, EngineConfig::default())
    }

    fn assemble(provider: Arc<dyn MapDataProvider>, config: EngineConfig) -> Self {
        let model = TileModel::new(config.costs.clone());
        let cache = GraphCache::with_capacity(config.graph_cache_capacity);
        Self { provider, config, model, cache, level: ArcSwapOption::empty() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> &TileModel {
        &self.model
    }

    pub fn graph(&self, id: &MapId) -> Result<Arc<MapGraph>> {
        self.cache.get_or_build(id, self.provider.as_ref(), &self.model)
    }

    /// Builds every map graph and the map-level graph up front.
    pub fn warm(&self) -> Result<usize> {
        let level = self.map_level()?;
        let ids = self.provider.map_ids();
        info!(maps = ids.len(), links = level.link_count(), "router warmed");
        Ok(ids.len())
    }

    /// Watched tiles of `id`, using `snapshot` observers when it lists the map.
    pub fn vision_zone(&self, id: &MapId, snapshot: Option<&ObserverSnapshot>) -> Result<VisionZone> {
        let graph = self.graph(id)?;
        Ok(zone_for(&graph, snapshot))
    }

    pub fn route(&self, from: &Node, to: &RouteTarget, prefs: &TraversalPreferences) -> Result<RouteOutcome> {
        self.route_inner(from, to, prefs, None)
    }

    pub fn route_with_observers(
        &self,
        from: &Node,
        to: &RouteTarget,
        prefs: &TraversalPreferences,
        snapshot: &ObserverSnapshot,
    ) -> Result<RouteOutcome> {
        self.route_inner(from, to, prefs, Some(snapshot))
    }

    fn route_inner(
        &self,
        from: &Node,
        to: &RouteTarget,
        prefs: &TraversalPreferences,
        snapshot: Option<&ObserverSnapshot>,
    ) -> Result<RouteOutcome> {
        let span = debug_span!("route", from = %from, to = %to);
        let _enter = span.enter();

        self.graph(&from.map)?.classification(from.x, from.y)?;
        if let RouteTarget::Tile(goal) = to {
            self.graph(&goal.map)?.classification(goal.x, goal.y)?;
        } else {
            self.graph(to.map())?;
        }

        let level = self.map_level()?;
        let routes = level.candidate_routes(
            &from.map,
            to.map(),
            prefs,
            self.config.max_map_routes,
            self.config.max_route_expansions,
        );
        if routes.is_empty() {
            return Ok(self.explain_no_route(&level, from, to, prefs));
        }

        let mut zones: BTreeMap<MapId, VisionZone> = BTreeMap::new();
        let mut first_blocked = None;
        let mut first_not_found = None;
        for (attempt, route) in routes.iter().enumerate() {
            match self.stitch(route, from, to, prefs, snapshot, &mut zones)? {
                RouteOutcome::Found(path) => {
                    debug!(attempt, segments = path.segments.len(), cost = path.total_cost, "route found");
                    return Ok(RouteOutcome::Found(path));
                }
                RouteOutcome::Blocked(b) => {
                    first_blocked.get_or_insert(b);
                }
                RouteOutcome::NotFound(nf) => {
                    first_not_found.get_or_insert(nf);
                }
            }
            if attempt + 1 < routes.len() {
                warn!(attempt, route = %route.iter().join(" -> "), "map route failed, trying next");
            }
        }

        if let Some(b) = first_blocked {
            return Ok(RouteOutcome::Blocked(b));
        }
        Ok(RouteOutcome::NotFound(
            first_not_found.unwrap_or_else(|| NotFound { nearest: from.clone(), reasons: BTreeSet::new() }),
        ))
    }

    fn explain_no_route(
        &self,
        level: &MapLevelGraph,
        from: &Node,
        to: &RouteTarget,
        prefs: &TraversalPreferences,
    ) -> RouteOutcome {
        if !prefs.has_all_capabilities() {
            let relaxed = prefs.with_all_capabilities();
            let routes =
                level.candidate_routes(&from.map, to.map(), &relaxed, 1, self.config.max_route_expansions);
            if let Some(blocked) = routes.first().and_then(|r| level.first_locked_link(r, prefs)) {
                return RouteOutcome::Blocked(blocked);
            }
        }
        RouteOutcome::NotFound(NotFound { nearest: from.clone(), reasons: BTreeSet::new() })
    }

    fn stitch(
        &self,
        route: &[MapId],
        from: &Node,
        to: &RouteTarget,
        prefs: &TraversalPreferences,
        snapshot: Option<&ObserverSnapshot>,
        zones: &mut BTreeMap<MapId, VisionZone>,
    ) -> Result<RouteOutcome> {
        let mut tried = BTreeSet::new();
        self.stitch_from(route, 0, from, to, prefs, snapshot, zones, &mut tried)
    }

    /// Routes from `entry` on `route[at]` to the target. Exits into the next
    /// map are tried cheapest first; one whose landing tile leads nowhere is
    /// abandoned for the next. `tried` holds `(leg, arrival)` pairs already
    /// explored, which all failed.
    #[allow(clippy::too_many_arguments)]
    fn stitch_from(
        &self,
        route: &[MapId],
        at: usize,
        entry: &Node,
        to: &RouteTarget,
        prefs: &TraversalPreferences,
        snapshot: Option<&ObserverSnapshot>,
        zones: &mut BTreeMap<MapId, VisionZone>,
        tried: &mut BTreeSet<(usize, Node)>,
    ) -> Result<RouteOutcome> {
        let Some(next) = route.get(at + 1) else {
            return self.final_leg(entry, to, prefs, snapshot, zones);
        };

        let graph = self.graph(&route[at])?;
        let next_graph = self.graph(next)?;
        zones.entry(route[at].clone()).or_insert_with(|| zone_for(&graph, snapshot));
        zones.entry(next.clone()).or_insert_with(|| zone_for(&next_graph, snapshot));
        let legs = {
            let astar = AStar::new(&graph, &self.model, &zones[&route[at]]).with_landing_zone(&zones[next]);
            self.exit_legs(&astar, &graph, entry, next, prefs)?
        };
        let legs = match legs {
            Legs::Found(legs) => legs,
            Legs::Failed(failure) => return Ok(failure),
        };

        let mut first_failure = None;
        for (seg, arrival) in legs {
            if !tried.insert((at + 1, arrival.clone())) {
                continue;
            }
            match self.stitch_from(route, at + 1, &arrival, to, prefs, snapshot, zones, tried)? {
                RouteOutcome::Found(rest) => {
                    let mut segments = Vec::with_capacity(rest.segments.len() + 1);
                    segments.push(seg);
                    segments.extend(rest.segments);
                    return Ok(RouteOutcome::Found(PathResult::from_segments(segments)));
                }
                failed => {
                    debug!(leg = at, arrival = %arrival, "exit leads nowhere");
                    first_failure.get_or_insert(failed);
                }
            }
        }
        Ok(first_failure.unwrap_or_else(|| {
            RouteOutcome::NotFound(NotFound { nearest: entry.clone(), reasons: BTreeSet::new() })
        }))
    }

    fn final_leg(
        &self,
        entry: &Node,
        to: &RouteTarget,
        prefs: &TraversalPreferences,
        snapshot: Option<&ObserverSnapshot>,
        zones: &mut BTreeMap<MapId, VisionZone>,
    ) -> Result<RouteOutcome> {
        match to {
            RouteTarget::Map(_) => Ok(RouteOutcome::Found(PathResult::from_segments(vec![PathSegment::stationary(
                entry.clone(),
            )]))),
            RouteTarget::Tile(goal) => {
                let graph = self.graph(&goal.map)?;
                let zone = zones.entry(goal.map.clone()).or_insert_with(|| zone_for(&graph, snapshot));
                AStar::new(&graph, &self.model, zone).find_path(entry, goal, prefs)
            }
        }
    }

    /// Every usable way from `entry` out of the current map into `next`,
    /// cheapest first. Equal costs keep exit order.
    fn exit_legs(
        &self,
        astar: &AStar<'_>,
        graph: &MapGraph,
        entry: &Node,
        next: &MapId,
        prefs: &TraversalPreferences,
    ) -> Result<Legs> {
        let exits = graph.exits_to(next);
        let mut legs: Vec<(PathSegment, Node)> = Vec::new();
        let mut first_miss: Option<NotFound> = None;

        for (src, e) in &exits {
            if !prefs.allows(e.gate()) {
                continue;
            }
            let (Some(crossing), Some(arrival)) = (astar.edge_cost(e, prefs).finite(), e.target_node()) else {
                continue;
            };
            let source = graph.node_at(*src);
            match astar.search(entry, &source, prefs, Finish::Bare)? {
                SearchOutcome::Found(mut seg) => {
                    seg.moves.push(e.kind.token());
                    seg.cost += crossing;
                    if let Some(observers) = astar.landing_watchers(arrival) {
                        seg.hazard_tiles += 1;
                        seg.crossed_observers.extend(observers.iter().copied());
                    }
                    legs.push((seg, arrival.clone()));
                }
                SearchOutcome::NotFound(nf) => {
                    first_miss.get_or_insert(nf);
                }
            }
        }
        if !legs.is_empty() {
            legs.sort_by(|a, b| a.0.cost.total_cmp(&b.0.cost));
            return Ok(Legs::Found(legs));
        }

        for (src, e) in &exits {
            let source = graph.node_at(*src);
            let reachable = astar.search(entry, &source, prefs, Finish::Bare)?.segment().is_some();
            if reachable {
                if let (Some(c), Some(at)) = (e.gate().filter(|c| !prefs.has(*c)), e.target_node()) {
                    return Ok(Legs::Failed(RouteOutcome::Blocked(Blocked { capability: c, at: at.clone() })));
                }
            } else if let Some(b) = astar.first_locked_gate(entry, &source, prefs)? {
                return Ok(Legs::Failed(RouteOutcome::Blocked(b)));
            }
        }
        let miss = first_miss.unwrap_or_else(|| NotFound { nearest: entry.clone(), reasons: BTreeSet::new() });
        Ok(Legs::Failed(RouteOutcome::NotFound(miss)))
    }

    fn map_level(&self) -> Result<Arc<MapLevelGraph>> {
        let ids = self.provider.map_ids();
        let mut h = FxHasher::default();
        for id in &ids {
            let map = self.provider.map(id).ok_or_else(|| NavError::UnknownMap(id.clone()))?;
            h.write_u64(static_fingerprint(&map, self.provider.as_ref()));
        }
        let fingerprint = h.finish();

        if let Some(entry) = self.level.load_full() {
            if entry.fingerprint == fingerprint {
                return Ok(Arc::clone(&entry.graph));
            }
        }

        let graphs = ids.iter().map(|id| self.graph(id)).collect::<Result<Vec<_>>>()?;
        let graph = Arc::new(MapLevelGraph::from_graphs(graphs.iter().map(|g| g.as_ref())));
        info!(maps = ids.len(), links = graph.link_count(), "map-level graph built");
        self.level.store(Some(Arc::new(LevelEntry { fingerprint, graph: Arc::clone(&graph) })));
        Ok(graph)
    }
}

fn zone_for(graph: &MapGraph, snapshot: Option<&ObserverSnapshot>) -> VisionZone {
    match snapshot.and_then(|s| s.get(graph.map_id())) {
        Some(observers) => VisionZoneCalculator::compute(graph, observers),
        None => VisionZoneCalculator::for_map(graph),
    }
}

// Prove Send + Sync bounds for compile-time safety.
#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert_bound<T: Send + Sync>() {}
    assert_bound::<WorldRouter>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::movement::Direction;
    use crate::models::{Capability, Connection, Map, ObserverId, Warp};
    use crate::world::provider::MapStore;

    use crate::models::MoveToken::{Down, Interact, Left, Right, Up};

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

    fn router(maps: Vec<Map>) -> WorldRouter {
        WorldRouter::with_defaults(Arc::new(MapStore::new(maps).unwrap()))
    }

    fn prefs() -> TraversalPreferences {
        TraversalPreferences::default()
    }

    #[test]
    fn single_map_route_is_one_segment() {
        let r = router(vec![map("A", &["....."; 5])]);
        let out = r.route(&Node::new("A", 0, 0), &Node::new("A", 4, 4).into(), &prefs()).unwrap();
        let path = out.path().unwrap();
        assert_eq!(path.segments.len(), 1);
        assert_eq!(path.total_cost, 8.0);
        assert_eq!(path.moves(), vec![Right, Right, Right, Right, Down, Down, Down, Down]);
    }

    #[test]
    fn connection_crossing_emits_direction_token() {
        let mut a = map("A", &["..", ".."]);
        a.connections.push(Connection { direction: Direction::Right, target: "B".into(), offset: 0, one_way: false });
        let mut b = map("B", &["..", ".."]);
        b.connections.push(Connection { direction: Direction::Left, target: "A".into(), offset: 0, one_way: false });
        let r = router(vec![a, b]);

        let out = r.route(&Node::new("A", 0, 0), &Node::new("B", 1, 0).into(), &prefs()).unwrap();
        let path = out.path().unwrap();
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].moves, vec![Right, Right]);
        assert_eq!(path.segments[0].exit, Node::new("A", 1, 0));
        assert_eq!(path.segments[1].entry, Node::new("B", 0, 0));
        assert_eq!(path.segments[1].moves, vec![Right]);
        assert_eq!(path.total_cost, 3.0);
    }

    #[test]
    fn map_target_ends_with_stationary_segment() {
        let mut a = map("A", &["..."]);
        a.warps.push(Warp { x: 2, y: 0, target: "B".into(), target_x: 1, target_y: 0 });
        let r = router(vec![a, map("B", &["..."])]);
        let out = r.route(&Node::new("A", 0, 0), &RouteTarget::Map("B".into()), &prefs()).unwrap();
        let path = out.path().unwrap();
        assert_eq!(path.moves(), vec![Right, Right, Interact]);
        let last = path.segments.last().unwrap();
        assert!(last.moves.is_empty());
        assert_eq!(last.entry, Node::new("B", 1, 0));
    }

    #[test]
    fn falls_back_to_second_map_route() {
        // A -> B is direct but B's landing is walled in; A -> C -> B works
        let mut a = map("A", &["..."]);
        a.warps = vec![
            Warp { x: 0, y: 0, target: "B".into(), target_x: 0, target_y: 0 },
            Warp { x: 2, y: 0, target: "C".into(), target_x: 0, target_y: 0 },
        ];
        let mut c = map("C", &[".."]);
        c.warps.push(Warp { x: 1, y: 0, target: "B".into(), target_x: 2, target_y: 0 });
        let b = map("B", &[".#."]);
        let r = router(vec![a, b, c]);

        let out = r.route(&Node::new("A", 1, 0), &Node::new("B", 2, 0).into(), &prefs()).unwrap();
        let path = out.path().unwrap();
        let maps: Vec<&str> = path.segments.iter().map(|s| s.map.as_str()).collect();
        assert_eq!(maps, vec!["A", "C", "B"]);
        assert_eq!(path.moves(), vec![Right, Interact, Right, Interact]);
    }

    #[test]
    fn dead_end_landing_falls_back_to_next_exit() {
        // the near warp lands west of B's wall, the far one east of it
        let mut a = map("A", &["......"]);
        a.warps = vec![
            Warp { x: 1, y: 0, target: "B".into(), target_x: 0, target_y: 0 },
            Warp { x: 5, y: 0, target: "B".into(), target_x: 4, target_y: 0 },
        ];
        let r = router(vec![a, map("B", &[".#..."])]);

        let out = r.route(&Node::new("A", 0, 0), &Node::new("B", 3, 0).into(), &prefs()).unwrap();
        let path = out.path().unwrap();
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[0].exit, Node::new("A", 5, 0));
        assert_eq!(path.segments[1].entry, Node::new("B", 4, 0));
        assert_eq!(path.moves(), vec![Right, Right, Right, Right, Right, Interact, Left]);
        assert_eq!(path.total_cost, 7.0);
    }

    #[test]
    fn dead_end_landing_midway_backtracks() {
        // A -> B -> C where only B's second landing reaches the exit to C
        let mut a = map("A", &["..."]);
        a.warps = vec![
            Warp { x: 0, y: 0, target: "B".into(), target_x: 0, target_y: 0 },
            Warp { x: 2, y: 0, target: "B".into(), target_x: 2, target_y: 0 },
        ];
        let mut b = map("B", &[".#.."]);
        b.warps.push(Warp { x: 3, y: 0, target: "C".into(), target_x: 0, target_y: 0 });
        let r = router(vec![a, b, map("C", &[".."])]);

        let out = r.route(&Node::new("A", 0, 0), &RouteTarget::Map("C".into()), &prefs()).unwrap();
        let path = out.path().unwrap();
        let maps: Vec<&str> = path.segments.iter().map(|s| s.map.as_str()).collect();
        assert_eq!(maps, vec!["A", "B", "C"]);
        assert_eq!(path.segments[1].entry, Node::new("B", 2, 0));
        assert_eq!(path.moves(), vec![Right, Right, Interact, Right, Interact]);
    }

    #[test]
    fn same_map_goal_reached_through_another_map() {
        let mut a = map("A", &[".#."]);
        a.warps.push(Warp { x: 0, y: 0, target: "B".into(), target_x: 0, target_y: 0 });
        let mut b = map("B", &[".."]);
        b.warps.push(Warp { x: 1, y: 0, target: "A".into(), target_x: 2, target_y: 0 });
        let r = router(vec![a, b]);

        let out = r.route(&Node::new("A", 0, 0), &Node::new("A", 2, 0).into(), &prefs()).unwrap();
        let path = out.path().unwrap();
        let maps: Vec<&str> = path.segments.iter().map(|s| s.map.as_str()).collect();
        assert_eq!(maps, vec!["A", "B", "A"]);
        assert_eq!(path.moves(), vec![Interact, Right, Interact]);
        assert_eq!(path.total_cost, 3.0);
    }

    #[test]
    fn observer_on_connection_landing_counts_as_hazard() {
        let mut a = map("A", &[".."]);
        a.connections.push(Connection { direction: Direction::Right, target: "B".into(), offset: 0, one_way: true });
        let mut b = map("B", &["..."]);
        b.observers.push(Observer { id: ObserverId(7), x: 2, y: 0, facing: Direction::Left, range: 2, defeated: false });
        let r = router(vec![a, b]);
        let (s, t) = (Node::new("A", 0, 0), RouteTarget::Tile(Node::new("B", 0, 0)));

        let plain = r.route(&s, &t, &prefs()).unwrap();
        let path = plain.path().unwrap();
        assert_eq!(path.moves(), vec![Right, Right]);
        assert_eq!(path.hazard_tiles, 1);
        assert_eq!(path.crossed_observers.iter().copied().collect::<Vec<_>>(), vec![ObserverId(7)]);
        assert_eq!(path.total_cost, 2.0);

        let seek = TraversalPreferences { seek_observers: true, ..prefs() };
        let path = r.route(&s, &t, &seek).unwrap();
        assert_eq!(path.path().unwrap().total_cost, 1.0 + r.config().costs.observer_seek_multiplier);
    }

    #[test]
    fn new_rejects_invalid_costs() {
        let store: Arc<dyn MapDataProvider> = Arc::new(MapStore::new(vec![map("A", &[".~."])]).unwrap());
        let mut config = EngineConfig::default();
        config.costs.gated_traversal_cost = -5.0;
        assert!(matches!(WorldRouter::new(Arc::clone(&store), config), Err(NavError::InvalidConfig(_))));
        assert!(WorldRouter::new(store, EngineConfig::default()).is_ok());
    }

    #[test]
    fn locked_crossing_is_blocked_at_landing_tile() {
        let mut a = map("A", &["."]);
        a.connections.push(Connection { direction: Direction::Down, target: "B".into(), offset: 0, one_way: true });
        let r = router(vec![a, map("B", &["~", "."])]);
        let (s, t) = (Node::new("A", 0, 0), RouteTarget::Tile(Node::new("B", 0, 1)));

        let out = r.route(&s, &t, &prefs()).unwrap();
        assert_eq!(
            out,
            RouteOutcome::Blocked(Blocked { capability: Capability::WaterCrossing, at: Node::new("B", 0, 0) })
        );

        let surf = prefs().with_capability(Capability::WaterCrossing);
        let out = r.route(&s, &t, &surf).unwrap();
        assert_eq!(out.path().unwrap().moves(), vec![Down, Down]);
    }

    #[test]
    fn disconnected_maps_are_not_found() {
        let r = router(vec![map("A", &["."]), map("B", &["."])]);
        let out = r.route(&Node::new("A", 0, 0), &RouteTarget::Map("B".into()), &prefs()).unwrap();
        match out {
            RouteOutcome::NotFound(nf) => {
                assert_eq!(nf.nearest, Node::new("A", 0, 0));
                assert!(nf.reasons.is_empty());
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn observer_snapshot_overrides_map_observers() {
        let r = router(vec![map("A", &["...", "..."])]);
        let mut snapshot = ObserverSnapshot::new();
        snapshot.insert(
            "A".into(),
            vec![Observer { id: ObserverId(4), x: 0, y: 0, facing: Direction::Right, range: 1, defeated: false }],
        );
        let avoid = TraversalPreferences { avoid_observers: true, ..prefs() };
        let (s, t) = (Node::new("A", 0, 0), RouteTarget::Tile(Node::new("A", 2, 0)));

        let plain = r.route(&s, &t, &avoid).unwrap();
        assert_eq!(plain.path().unwrap().moves(), vec![Right, Right]);

        let watched = r.route_with_observers(&s, &t, &avoid, &snapshot).unwrap();
        let path = watched.path().unwrap();
        assert_eq!(path.moves(), vec![Down, Right, Right, Up]);
        assert_eq!(path.hazard_tiles, 0);

        assert_eq!(r.vision_zone(&"A".into(), Some(&snapshot)).unwrap().len(), 1);
        assert!(r.vision_zone(&"A".into(), None).unwrap().is_empty());
    }

    #[test]
    fn invalid_endpoints_are_errors() {
        let r = router(vec![map("A", &[".."])]);
        assert!(matches!(
            r.route(&Node::new("Z", 0, 0), &RouteTarget::Map("A".into()), &prefs()),
            Err(NavError::UnknownMap(_))
        ));
        assert!(matches!(
            r.route(&Node::new("A", 5, 0), &RouteTarget::Map("A".into()), &prefs()),
            Err(NavError::InvalidTile { .. })
        ));
        assert!(matches!(
            r.route(&Node::new("A", 0, 0), &Node::new("A", 0, 3).into(), &prefs()),
            Err(NavError::InvalidTile { .. })
        ));
    }

    #[test]
    fn warm_builds_every_map() {
        let r = router(vec![map("A", &["."]), map("B", &["."])]);
        assert_eq!(r.warm().unwrap(), 2);
    }
}
