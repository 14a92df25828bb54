pub mod astar;
pub mod config;
pub mod errors;
pub mod graph;
pub mod models;
pub mod options;
pub mod tile;
pub mod vision;
pub mod world;

pub use astar::{AStar, SearchOutcome};
pub use config::{CostConfig, EngineConfig};
pub use errors::{NavError, Result};
pub use graph::{Direction, GraphCache, MapGraph};
pub use models::{Blocked, Capability, Map, MapId, MoveToken, Node, NotFound, PathResult, PathSegment, RouteOutcome};
pub use options::TraversalPreferences;
pub use tile::{TileClassification, TileModel};
pub use vision::{VisionZone, VisionZoneCalculator};
pub use world::{MapDataProvider, MapStore, ObserverSnapshot, RouteTarget, WorldRouter};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
