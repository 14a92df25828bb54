use serde::{Deserialize, Serialize};

use crate::config::CostConfig;
use crate::errors::{NavError, Result};
use crate::graph::movement::Direction;
use crate::models::{Capability, Map};
use crate::options::TraversalPreferences;

pub const OPEN_COST: f64 = 1.0;

/// Terrain class of a single tile, derived once from its raw code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileClassification {
    Open,
    TallGrass,
    Water,
    OneWayDrop(Direction),
    Gated(Capability),
    Wall,
    Boundary,
}

impl TileClassification {
    /// Terrain code legend:
    /// `.` open, `,` tall grass, `~` water, `v ^ < >` one-way drops,
    /// `T` tree (CUT), `B` boulder (STRENGTH), `R` rock (ROCK_SMASH),
    /// `W` waterfall (WATERFALL), `#` wall, `D` door/boundary.
    pub fn from_code(code: u8) -> Option<Self> {
        if let Some(d) = Direction::from_drop_code(code) {
            return Some(TileClassification::OneWayDrop(d));
        }
        match code {
            b'.' => Some(TileClassification::Open),
            b',' => Some(TileClassification::TallGrass),
            b'~' => Some(TileClassification::Water),
            b'T' => Some(TileClassification::Gated(Capability::Cut)),
            b'B' => Some(TileClassification::Gated(Capability::Strength)),
            b'R' => Some(TileClassification::Gated(Capability::RockSmash)),
            b'W' => Some(TileClassification::Gated(Capability::Waterfall)),
            b'#' => Some(TileClassification::Wall),
            b'D' => Some(TileClassification::Boundary),
            _ => None,
        }
    }

    /// Capability required to enter a tile of this class.
    pub fn gate(self) -> Option<Capability> {
        match self {
            TileClassification::Water => Some(Capability::WaterCrossing),
            TileClassification::Gated(c) => Some(c),
            _ => None,
        }
    }

    pub fn blocks_sight(self) -> bool {
        matches!(self, TileClassification::Wall | TileClassification::Gated(_))
    }

    /// Whether a step moving in `dir` may end on a tile of this class.
    pub fn admits_entry(self, dir: Direction) -> bool {
        match self {
            TileClassification::Wall => false,
            TileClassification::OneWayDrop(d) => d == dir,
            _ => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpassableReason {
    MissingCapability(Capability),
    Wall,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CostOutcome {
    Finite(f64),
    Impassable(ImpassableReason),
}

impl CostOutcome {
    pub fn finite(self) -> Option<f64> {
        match self {
            CostOutcome::Finite(c) => Some(c),
            CostOutcome::Impassable(_) => None,
        }
    }
}

/// Converts terrain classes into traversal costs for a given set of preferences.
#[derive(Clone, Debug, Default)]
pub struct TileModel {
    costs: CostConfig,
}

impl TileModel {
    pub fn new(costs: CostConfig) -> Self {
        Self { costs }
    }

    pub fn costs(&self) -> &CostConfig {
        &self.costs
    }

    pub fn classify_at(map: &Map, x: i32, y: i32) -> Result<TileClassification> {
        let code = map.code_at(x, y)?;
        TileClassification::from_code(code)
            .ok_or_else(|| NavError::invalid_data(&map.id, format!("unknown terrain code {:?} at ({}, {})", code as char, x, y)))
    }

    pub fn cost(&self, class: TileClassification, prefs: &TraversalPreferences) -> CostOutcome {
        match class {
            TileClassification::Open | TileClassification::Boundary | TileClassification::OneWayDrop(_) => {
                CostOutcome::Finite(OPEN_COST)
            }
            TileClassification::TallGrass => CostOutcome::Finite(OPEN_COST * self.grass_multiplier(prefs)),
            TileClassification::Water | TileClassification::Gated(_) => {
                let Some(gate) = class.gate() else { return CostOutcome::Finite(OPEN_COST) };
                if prefs.has(gate) {
                    CostOutcome::Finite(self.costs.gated_traversal_cost)
                } else {
                    CostOutcome::Impassable(ImpassableReason::MissingCapability(gate))
                }
            }
            TileClassification::Wall => CostOutcome::Impassable(ImpassableReason::Wall),
        }
    }

    /// Cost with gates ignored and neutral preferences; stored on graph edges.
    pub fn base_cost(&self, class: TileClassification) -> f64 {
        match class {
            TileClassification::Water | TileClassification::Gated(_) => self.costs.gated_traversal_cost,
            _ => OPEN_COST,
        }
    }

    pub fn grass_multiplier(&self, prefs: &TraversalPreferences) -> f64 {
        if prefs.avoid_tall_grass {
            self.costs.grass_avoid_multiplier
        } else if prefs.seek_tall_grass {
            self.costs.grass_seek_multiplier
        } else {
            1.0
        }
    }

    pub fn observer_multiplier(&self, prefs: &TraversalPreferences) -> f64 {
        if prefs.avoid_observers {
            self.costs.observer_avoid_multiplier
        } else if prefs.seek_observers {
            self.costs.observer_seek_multiplier
        } else {
            1.0
        }
    }

    /// Lower bound on the cost of any single step under `prefs`. Scaling the
    /// Manhattan heuristic by this keeps it admissible when a "seek" multiplier
    /// drops step costs below 1.0.
    pub fn min_step_cost(&self, prefs: &TraversalPreferences) -> f64 {
        let mut min = OPEN_COST.min(OPEN_COST * self.grass_multiplier(prefs));
        if !prefs.unlocked_capabilities.is_empty() {
            min = min.min(self.costs.gated_traversal_cost);
        }
        min * self.observer_multiplier(prefs).min(1.0)
    }
}
