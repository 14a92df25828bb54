use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use bitvec::prelude::*;
use tracing::debug;

use crate::errors::Result;
use crate::graph::map_graph::{EdgeKind, GraphEdge, MapGraph, Target};
use crate::graph::movement::DIRECTION_ORDER;
use crate::models::{Blocked, Capability, MoveToken, Node, NotFound, ObserverId, PathResult, PathSegment, RouteOutcome};
use crate::options::TraversalPreferences;
use crate::tile::{CostOutcome, ImpassableReason, TileClassification, TileModel};
use crate::vision::VisionZone;

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Found(PathSegment),
    NotFound(NotFound),
}

impl SearchOutcome {
    pub fn segment(&self) -> Option<&PathSegment> {
        match self {
            SearchOutcome::Found(s) => Some(s),
            SearchOutcome::NotFound(_) => None,
        }
    }
}

/// Whether a path that ends on an interactive tile gets a closing `INTERACT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Finish {
    Auto,
    Bare,
}

#[derive(Clone, Copy, Debug)]
struct QueueNode {
    f: f64,
    y: i32,
    x: i32,
    seq: u64,
    slot: usize,
}

impl PartialEq for QueueNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for QueueNode {}
impl PartialOrd for QueueNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is max-heap; invert ordering for min-heap behavior
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| (other.y, other.x, other.seq).cmp(&(self.y, self.x, self.seq)))
    }
}

struct Step {
    token: MoveToken,
    to: Node,
    gate: Option<Capability>,
    cost: f64,
    watched_by: Option<BTreeSet<ObserverId>>,
}

enum Run {
    Found(Vec<Step>),
    NotFound(NotFound),
}

/// Minimum-cost search inside one map graph. Edges that leave the map are
/// terminal: they are only followed when the goal is the node they land on.
pub struct AStar<'a> {
    graph: &'a MapGraph,
    model: &'a TileModel,
    zone: &'a VisionZone,
    landing: Option<&'a VisionZone>,
}

impl<'a> AStar<'a> {
    pub fn new(graph: &'a MapGraph, model: &'a TileModel, zone: &'a VisionZone) -> Self {
        Self { graph, model, zone, landing: None }
    }

    /// Watched tiles of the map that cross-map edges land in. Without it,
    /// landing tiles are treated as unwatched.
    pub fn with_landing_zone(mut self, zone: &'a VisionZone) -> Self {
        self.landing = Some(zone);
        self
    }

    pub(crate) fn landing_watchers(&self, node: &Node) -> Option<&'a BTreeSet<ObserverId>> {
        self.landing.and_then(|z| z.observers_at(node.x, node.y))
    }

    pub fn find(&self, start: &Node, goal: &Node, prefs: &TraversalPreferences) -> Result<SearchOutcome> {
        self.search(start, goal, prefs, Finish::Auto)
    }

    /// Like [`AStar::find`], but a failed search is re-run with every
    /// capability unlocked to tell a gated goal from an unreachable one.
    pub fn find_path(&self, start: &Node, goal: &Node, prefs: &TraversalPreferences) -> Result<RouteOutcome> {
        match self.find(start, goal, prefs)? {
            SearchOutcome::Found(seg) => Ok(RouteOutcome::Found(PathResult::from_segments(vec![seg]))),
            SearchOutcome::NotFound(nf) => match self.first_locked_gate(start, goal, prefs)? {
                Some(blocked) => Ok(RouteOutcome::Blocked(blocked)),
                None => Ok(RouteOutcome::NotFound(nf)),
            },
        }
    }

    pub(crate) fn search(
        &self,
        start: &Node,
        goal: &Node,
        prefs: &TraversalPreferences,
        finish: Finish,
    ) -> Result<SearchOutcome> {
        match self.run(start, goal, prefs)? {
            Run::Found(steps) => Ok(SearchOutcome::Found(self.to_segment(start, goal, steps, finish))),
            Run::NotFound(nf) => Ok(SearchOutcome::NotFound(nf)),
        }
    }

    /// First gate the caller lacks along the path found with everything
    /// unlocked, located at the tile it guards.
    pub(crate) fn first_locked_gate(
        &self,
        start: &Node,
        goal: &Node,
        prefs: &TraversalPreferences,
    ) -> Result<Option<Blocked>> {
        if prefs.has_all_capabilities() {
            return Ok(None);
        }
        let relaxed = prefs.with_all_capabilities();
        match self.run(start, goal, &relaxed)? {
            Run::Found(steps) => Ok(steps.into_iter().find_map(|s| match s.gate {
                Some(c) if !prefs.has(c) => Some(Blocked { capability: c, at: s.to }),
                _ => None,
            })),
            Run::NotFound(_) => Ok(None),
        }
    }

    /// Cost of traversing `e` under `prefs`, observer overlay included.
    pub(crate) fn edge_cost(&self, e: &GraphEdge, prefs: &TraversalPreferences) -> CostOutcome {
        if e.kind == EdgeKind::Warp {
            return CostOutcome::Finite(e.base_cost);
        }
        let outcome = self.model.cost(e.terrain, prefs);
        let CostOutcome::Finite(c) = outcome else { return outcome };
        let watched = match &e.target {
            Target::Local(i) => {
                let (x, y) = self.graph.coords(*i);
                self.zone.is_watched(x, y)
            }
            Target::Foreign(node) => self.landing_watchers(node).is_some(),
        };
        if watched {
            CostOutcome::Finite(c * self.model.observer_multiplier(prefs))
        } else {
            outcome
        }
    }

    fn run(&self, start: &Node, goal: &Node, prefs: &TraversalPreferences) -> Result<Run> {
        let g = self.graph;
        let s = g.require_local(start)?;
        let n = g.node_count();
        // Foreign goals occupy the extra slot `n`.
        let goal_slot = if &goal.map == g.map_id() { g.require_local(goal)? } else { n };
        if s == goal_slot {
            return Ok(Run::Found(Vec::new()));
        }

        let min_step = if g.has_local_teleports() { 0.0 } else { self.model.min_step_cost(prefs) };
        let distance = |slot: usize| -> u32 {
            if goal_slot == n {
                return 0;
            }
            let (x, y) = g.coords(slot);
            x.abs_diff(goal.x) + y.abs_diff(goal.y)
        };
        let heuristic = |slot: usize| -> f64 { distance(slot) as f64 * min_step };

        let mut g_score = vec![f64::INFINITY; n + 1];
        let mut came_from: Vec<Option<(usize, usize)>> = vec![None; n + 1];
        let mut closed = bitvec![0; n + 1];
        let mut open = BinaryHeap::new();
        let mut reasons = BTreeSet::new();
        let mut expanded: u64 = 0;
        let mut seq: u64 = 0;
        let mut nearest = (u32::MAX, s);

        g_score[s] = 0.0;
        open.push(QueueNode { f: heuristic(s), y: start.y, x: start.x, seq, slot: s });

        while let Some(qn) = open.pop() {
            // Discard stale
            if closed[qn.slot] {
                continue;
            }
            closed.set(qn.slot, true);

            if qn.slot == goal_slot {
                debug!(map = %g.map_id(), expanded, cost = g_score[goal_slot], "search found path");
                return Ok(Run::Found(self.reconstruct(&came_from, s, goal_slot, goal, prefs)));
            }

            let cur = qn.slot;
            expanded += 1;
            let d = distance(cur);
            if d < nearest.0 {
                nearest = (d, cur);
            }
            self.note_walls(cur, &mut reasons);

            for (ei, e) in g.edges_from(cur).iter().enumerate() {
                let next = match &e.target {
                    Target::Local(i) => *i,
                    Target::Foreign(node) if goal_slot == n && node == goal => n,
                    Target::Foreign(_) => continue,
                };
                if closed[next] {
                    continue;
                }
                let cost = match self.edge_cost(e, prefs) {
                    CostOutcome::Finite(c) => c,
                    CostOutcome::Impassable(reason) => {
                        reasons.insert(reason);
                        continue;
                    }
                };
                let tentative = g_score[cur] + cost;
                if tentative < g_score[next] {
                    g_score[next] = tentative;
                    came_from[next] = Some((cur, ei));
                    seq += 1;
                    let (x, y) = if next == n { (goal.x, goal.y) } else { g.coords(next) };
                    open.push(QueueNode { f: tentative + heuristic(next), y, x, seq, slot: next });
                }
            }
        }

        debug!(map = %g.map_id(), expanded, reasons = reasons.len(), "search exhausted");
        Ok(Run::NotFound(NotFound { nearest: g.node_at(nearest.1), reasons }))
    }

    fn note_walls(&self, idx: usize, reasons: &mut BTreeSet<ImpassableReason>) {
        let (x, y) = self.graph.coords(idx);
        for dir in DIRECTION_ORDER {
            let (nx, ny) = dir.step(x, y);
            if let Ok(TileClassification::Wall) = self.graph.classification(nx, ny) {
                reasons.insert(ImpassableReason::Wall);
                return;
            }
        }
    }

    fn reconstruct(
        &self,
        came_from: &[Option<(usize, usize)>],
        start: usize,
        goal_slot: usize,
        goal: &Node,
        prefs: &TraversalPreferences,
    ) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut cur = goal_slot;
        while cur != start {
            let Some((prev, ei)) = came_from[cur] else { break };
            let e = &self.graph.edges_from(prev)[ei];
            let (to, watched_by) = match &e.target {
                Target::Local(i) => {
                    let (x, y) = self.graph.coords(*i);
                    (self.graph.node_at(*i), self.zone.observers_at(x, y).cloned())
                }
                Target::Foreign(_) => (goal.clone(), self.landing_watchers(goal).cloned()),
            };
            steps.push(Step {
                token: e.kind.token(),
                to,
                gate: e.gate(),
                cost: self.edge_cost(e, prefs).finite().unwrap_or(0.0),
                watched_by,
            });
            cur = prev;
        }
        steps.reverse();
        steps
    }

    fn to_segment(&self, start: &Node, goal: &Node, steps: Vec<Step>, finish: Finish) -> PathSegment {
        let mut seg = PathSegment::stationary(start.clone());
        seg.exit = goal.clone();
        for step in steps {
            seg.moves.push(step.token);
            seg.cost += step.cost;
            if let Some(observers) = step.watched_by {
                seg.hazard_tiles += 1;
                seg.crossed_observers.extend(observers);
            }
        }
        let local_goal = &goal.map == self.graph.map_id();
        if finish == Finish::Auto && local_goal && self.graph.requires_interaction(goal.x, goal.y) {
            seg.moves.push(MoveToken::Interact);
            seg.cost += self.model.costs().interaction_cost;
        }
        seg
    }
}
