use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{NavError, Result};

pub const DEFAULT_GRASS_AVOID_MULTIPLIER: f64 = 10.0;
pub const DEFAULT_GRASS_SEEK_MULTIPLIER: f64 = 0.5;
pub const DEFAULT_GATED_TRAVERSAL_COST: f64 = 2.0;
pub const DEFAULT_OBSERVER_AVOID_MULTIPLIER: f64 = 50.0;
pub const DEFAULT_OBSERVER_SEEK_MULTIPLIER: f64 = 0.5;
pub const DEFAULT_INTERACTION_COST: f64 = 1.0;

pub const DEFAULT_GRAPH_CACHE_CAPACITY: usize = 64;
pub const DEFAULT_MAX_MAP_ROUTES: usize = 4;
pub const DEFAULT_MAX_ROUTE_EXPANSIONS: u64 = 10_000;

/// Cost constants consumed by the tile model. Open ground always costs 1.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub grass_avoid_multiplier: f64,
    pub grass_seek_multiplier: f64,
    pub gated_traversal_cost: f64,
    pub observer_avoid_multiplier: f64,
    pub observer_seek_multiplier: f64,
    pub interaction_cost: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            grass_avoid_multiplier: DEFAULT_GRASS_AVOID_MULTIPLIER,
            grass_seek_multiplier: DEFAULT_GRASS_SEEK_MULTIPLIER,
            gated_traversal_cost: DEFAULT_GATED_TRAVERSAL_COST,
            observer_avoid_multiplier: DEFAULT_OBSERVER_AVOID_MULTIPLIER,
            observer_seek_multiplier: DEFAULT_OBSERVER_SEEK_MULTIPLIER,
            interaction_cost: DEFAULT_INTERACTION_COST,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub costs: CostConfig,
    /// Number of per-map graphs kept in memory.
    pub graph_cache_capacity: usize,
    /// Alternative map-level routes tried before giving up.
    pub max_map_routes: usize,
    pub max_route_expansions: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            costs: CostConfig::default(),
            graph_cache_capacity: DEFAULT_GRAPH_CACHE_CAPACITY,
            max_map_routes: DEFAULT_MAX_MAP_ROUTES,
            max_route_expansions: DEFAULT_MAX_ROUTE_EXPANSIONS,
        }
    }
}

impl CostConfig {
    /// Every cost and multiplier must be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("grass_avoid_multiplier", self.grass_avoid_multiplier),
            ("grass_seek_multiplier", self.grass_seek_multiplier),
            ("gated_traversal_cost", self.gated_traversal_cost),
            ("observer_avoid_multiplier", self.observer_avoid_multiplier),
            ("observer_seek_multiplier", self.observer_seek_multiplier),
            ("interaction_cost", self.interaction_cost),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(NavError::InvalidConfig(format!("costs.{} must be finite and > 0, got {}", name, value)));
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.costs.validate()?;
        if self.graph_cache_capacity == 0 {
            return Err(NavError::InvalidConfig("graph_cache_capacity must be > 0".into()));
        }
        if self.max_map_routes == 0 {
            return Err(NavError::InvalidConfig("max_map_routes must be > 0".into()));
        }
        if self.max_route_expansions == 0 {
            return Err(NavError::InvalidConfig("max_route_expansions must be > 0".into()));
        }
        Ok(())
    }

    /// Defaults overridden by `TILENAV_*` environment variables. Unparseable
    /// or non-positive values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        let costs = &mut cfg.costs;
        override_cost(&mut costs.grass_avoid_multiplier, "TILENAV_GRASS_AVOID_MULTIPLIER");
        override_cost(&mut costs.grass_seek_multiplier, "TILENAV_GRASS_SEEK_MULTIPLIER");
        override_cost(&mut costs.gated_traversal_cost, "TILENAV_GATED_TRAVERSAL_COST");
        override_cost(&mut costs.observer_avoid_multiplier, "TILENAV_OBSERVER_AVOID_MULTIPLIER");
        override_cost(&mut costs.observer_seek_multiplier, "TILENAV_OBSERVER_SEEK_MULTIPLIER");
        override_cost(&mut costs.interaction_cost, "TILENAV_INTERACTION_COST");
        if let Some(n) = env_parse::<usize>("TILENAV_GRAPH_CACHE_CAPACITY").filter(|n| *n > 0) {
            cfg.graph_cache_capacity = n;
        }
        if let Some(n) = env_parse::<usize>("TILENAV_MAX_MAP_ROUTES").filter(|n| *n > 0) {
            cfg.max_map_routes = n;
        }
        if let Some(n) = env_parse::<u64>("TILENAV_MAX_ROUTE_EXPANSIONS").filter(|n| *n > 0) {
            cfg.max_route_expansions = n;
        }
        cfg
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(var = name, value = %raw, "ignoring unparseable config value");
    }
    parsed
}

fn override_cost(slot: &mut f64, name: &str) {
    if let Some(v) = env_parse::<f64>(name) {
        if v.is_finite() && v > 0.0 {
            *slot = v;
        } else {
            warn!(var = name, value = v, "ignoring non-positive cost");
        }
    }
}
