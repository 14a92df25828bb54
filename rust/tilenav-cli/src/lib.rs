//! World-file loading and argument parsing for the `tilenav` binary.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use tilenav_core::{
    Capability, EngineConfig, Map, MapId, MapStore, Node, RouteOutcome, RouteTarget, TraversalPreferences, WorldRouter,
};

/// On-disk world: every map plus an optional engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldFile {
    #[serde(default)]
    pub config: Option<EngineConfig>,
    pub maps: Vec<Map>,
}

pub fn load_world(path: &Path) -> Result<WorldFile> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let world: WorldFile = serde_json::from_str(&raw).with_context(|| format!("failed to parse {:?}", path))?;
    info!(path = %path.display(), maps = world.maps.len(), "world loaded");
    Ok(world)
}

/// Parses `MAP:X:Y`. The map id may itself contain colons.
pub fn parse_node(s: &str) -> Result<Node> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(y), Some(x), Some(map)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected MAP:X:Y, got {:?}", s);
    };
    if map.is_empty() {
        bail!("missing map id in {:?}", s);
    }
    let x: i32 = x.trim().parse().with_context(|| format!("bad x coordinate in {:?}", s))?;
    let y: i32 = y.trim().parse().with_context(|| format!("bad y coordinate in {:?}", s))?;
    Ok(Node::new(map, x, y))
}

/// Parses `MAP:X:Y` as a tile target, or a bare `MAP` as a whole-map target.
/// A string whose last two `:` fields include a number is taken as a tile,
/// so `A:x:2` is an error rather than a map named `A:x:2`.
pub fn parse_target(s: &str) -> Result<RouteTarget> {
    if s.is_empty() {
        bail!("empty route target");
    }
    let looks_like_tile = s.contains(':') && s.rsplit(':').take(2).any(|p| p.trim().parse::<i32>().is_ok());
    if looks_like_tile {
        return parse_node(s).map(RouteTarget::Tile);
    }
    Ok(RouteTarget::Map(MapId::new(s)))
}

pub fn parse_capability(s: &str) -> Result<Capability> {
    s.parse::<Capability>().map_err(anyhow::Error::from)
}

/// Builds a router over `world`. A config embedded in the world file replaces
/// `fallback` entirely.
pub fn build_router(world: WorldFile, fallback: EngineConfig) -> Result<WorldRouter> {
    let config = world.config.unwrap_or(fallback);
    let store = MapStore::new(world.maps).context("world failed validation")?;
    WorldRouter::new(Arc::new(store), config).context("engine config failed validation")
}

pub fn route(router: &WorldRouter, from: &Node, to: &RouteTarget, prefs: &TraversalPreferences) -> Result<RouteOutcome> {
    router.route(from, to, prefs).with_context(|| format!("routing {} -> {} failed", from, to))
}

/// Process exit status for an outcome: 0 found, 2 blocked or not found.
pub fn exit_status(outcome: &RouteOutcome) -> u8 {
    if outcome.is_found() {
        0
    } else {
        2
    }
}
