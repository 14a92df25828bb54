use thiserror::Error;

use crate::models::MapId;

/// Failures that indicate bad input rather than an unreachable goal.
/// Unreachable goals are reported as [`crate::models::RouteOutcome`] values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("tile ({x}, {y}) is outside map {map}")]
    InvalidTile { map: MapId, x: i32, y: i32 },
    #[error("invalid map data for {map}: {detail}")]
    InvalidMapData { map: MapId, detail: String },
    #[error("unknown map {0}")]
    UnknownMap(MapId),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl NavError {
    pub(crate) fn invalid_data(map: &MapId, detail: impl Into<String>) -> Self {
        NavError::InvalidMapData { map: map.clone(), detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, NavError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized capability: {0}")]
pub struct ParseCapabilityError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized direction: {0}")]
pub struct ParseDirectionError(pub String);
