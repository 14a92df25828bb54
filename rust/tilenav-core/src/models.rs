use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{NavError, ParseCapabilityError, Result};
use crate::graph::movement::Direction;
use crate::tile::ImpassableReason;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        MapId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapId {
    fn from(s: &str) -> Self {
        MapId(s.to_string())
    }
}

impl From<String> for MapId {
    fn from(s: String) -> Self {
        MapId(s)
    }
}

/// A tile in a specific map.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Node {
    pub map: MapId,
    pub x: i32,
    pub y: i32,
}

impl Node {
    pub fn new(map: impl Into<MapId>, x: i32, y: i32) -> Self {
        Node { map: map.into(), x, y }
    }

    pub fn at(&self, x: i32, y: i32) -> Self {
        Node { map: self.map.clone(), x, y }
    }

    /// Manhattan distance, or `None` when the nodes live in different maps.
    pub fn manhattan(&self, other: &Node) -> Option<u32> {
        if self.map != other.map {
            return None;
        }
        Some(self.x.abs_diff(other.x) + self.y.abs_diff(other.y))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:({}, {})", self.map, self.x, self.y)
    }
}

/// Traversal abilities that gate obstacles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    WaterCrossing,
    Cut,
    Strength,
    RockSmash,
    Waterfall,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::WaterCrossing,
        Capability::Cut,
        Capability::Strength,
        Capability::RockSmash,
        Capability::Waterfall,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Capability::WaterCrossing => "WATER_CROSSING",
            Capability::Cut => "CUT",
            Capability::Strength => "STRENGTH",
            Capability::RockSmash => "ROCK_SMASH",
            Capability::Waterfall => "WATERFALL",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase().replace('-', "_");
        Capability::ALL
            .into_iter()
            .find(|c| c.name() == norm)
            .ok_or_else(|| ParseCapabilityError(s.to_string()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(pub u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveToken {
    Up,
    Down,
    Left,
    Right,
    Interact,
}

impl From<Direction> for MoveToken {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => MoveToken::Up,
            Direction::Down => MoveToken::Down,
            Direction::Left => MoveToken::Left,
            Direction::Right => MoveToken::Right,
        }
    }
}

/// Adjacent-map link along one edge of a map. A tile on the shared edge at
/// coordinate `c` continues at `c - offset` in the target map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub direction: Direction,
    pub target: MapId,
    #[serde(default)]
    pub offset: i32,
    #[serde(default)]
    pub one_way: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warp {
    pub x: i32,
    pub y: i32,
    pub target: MapId,
    pub target_x: i32,
    pub target_y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observer {
    pub id: ObserverId,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    pub range: u32,
    #[serde(default)]
    pub defeated: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoiKind {
    Item,
    Sign,
    Npc,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub x: i32,
    pub y: i32,
    pub kind: PoiKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One discrete map as supplied by the data provider.
///
/// `terrain` holds `height` rows of `width` terrain codes each; see
/// [`crate::tile::TileClassification::from_code`] for the legend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    pub id: MapId,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tileset: u32,
    pub terrain: Vec<String>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub warps: Vec<Warp>,
    #[serde(default)]
    pub observers: Vec<Observer>,
    #[serde(default)]
    pub points_of_interest: Vec<PointOfInterest>,
}

impl Map {
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn tile_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw terrain code at `(x, y)`.
    pub fn code_at(&self, x: i32, y: i32) -> Result<u8> {
        if !self.in_bounds(x, y) {
            return Err(NavError::InvalidTile { map: self.id.clone(), x, y });
        }
        self.terrain
            .get(y as usize)
            .and_then(|row| row.as_bytes().get(x as usize).copied())
            .ok_or_else(|| NavError::invalid_data(&self.id, format!("terrain row {} shorter than width {}", y, self.width)))
    }

    pub fn node(&self, x: i32, y: i32) -> Node {
        Node::new(self.id.clone(), x, y)
    }

    /// Hashes everything graph construction depends on. Observers are excluded
    /// since they are applied as a per-query overlay.
    pub fn hash_static<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.width.hash(state);
        self.height.hash(state);
        self.tileset.hash(state);
        self.terrain.hash(state);
        self.connections.hash(state);
        self.warps.hash(state);
        self.points_of_interest.hash(state);
    }
}

/// The portion of a path confined to a single map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub map: MapId,
    pub moves: Vec<MoveToken>,
    pub entry: Node,
    pub exit: Node,
    pub cost: f64,
    pub hazard_tiles: u32,
    pub crossed_observers: BTreeSet<ObserverId>,
}

impl PathSegment {
    /// A segment that starts and ends on `at` without moving.
    pub fn stationary(at: Node) -> Self {
        PathSegment {
            map: at.map.clone(),
            moves: Vec::new(),
            entry: at.clone(),
            exit: at,
            cost: 0.0,
            hazard_tiles: 0,
            crossed_observers: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub segments: Vec<PathSegment>,
    pub total_cost: f64,
    pub hazard_tiles: u32,
    pub crossed_observers: BTreeSet<ObserverId>,
}

impl PathResult {
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        let total_cost = segments.iter().map(|s| s.cost).sum();
        let hazard_tiles = segments.iter().map(|s| s.hazard_tiles).sum();
        let crossed_observers = segments.iter().flat_map(|s| s.crossed_observers.iter().copied()).collect();
        PathResult { segments, total_cost, hazard_tiles, crossed_observers }
    }

    /// All move tokens across segments, in order.
    pub fn moves(&self) -> Vec<MoveToken> {
        self.segments.iter().flat_map(|s| s.moves.iter().copied()).collect()
    }
}

/// The goal is reachable in principle but needs a capability the caller lacks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocked {
    pub capability: Capability,
    pub at: Node,
}

/// The goal is unreachable even with every capability unlocked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFound {
    pub nearest: Node,
    pub reasons: BTreeSet<ImpassableReason>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Found(PathResult),
    Blocked(Blocked),
    NotFound(NotFound),
}

impl RouteOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, RouteOutcome::Found(_))
    }

    pub fn path(&self) -> Option<&PathResult> {
        match self {
            RouteOutcome::Found(p) => Some(p),
            _ => None,
        }
    }

    pub fn blocked(&self) -> Option<&Blocked> {
        match self {
            RouteOutcome::Blocked(b) => Some(b),
            _ => None,
        }
    }
}
