//! Four-way movement directions and their fixed expansion order.
//! `y` grows downward, so `Up` is `dy = -1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseDirectionError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[serde(alias = "up", alias = "north", alias = "NORTH")]
    Up,
    #[serde(alias = "down", alias = "south", alias = "SOUTH")]
    Down,
    #[serde(alias = "left", alias = "west", alias = "WEST")]
    Left,
    #[serde(alias = "right", alias = "east", alias = "EAST")]
    Right,
}

// Deterministic neighbor order used by graph construction.
pub const DIRECTION_ORDER: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

impl Direction {
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    #[inline]
    pub fn step(self, x: i32, y: i32) -> (i32, i32) {
        let (dx, dy) = self.delta();
        (x + dx, y + dy)
    }

    /// Terrain code of a one-way drop that lands in this direction.
    pub const fn drop_code(self) -> u8 {
        match self {
            Direction::Up => b'^',
            Direction::Down => b'v',
            Direction::Left => b'<',
            Direction::Right => b'>',
        }
    }

    pub const fn from_drop_code(code: u8) -> Option<Self> {
        match code {
            b'^' => Some(Direction::Up),
            b'v' => Some(Direction::Down),
            b'<' => Some(Direction::Left),
            b'>' => Some(Direction::Right),
            _ => None,
        }
    }

    /// Direction of a single four-connected step, if `to` is adjacent to `from`.
    pub fn between(from: (i32, i32), to: (i32, i32)) -> Option<Self> {
        match (to.0 - from.0, to.1 - from.1) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "north" => Ok(Direction::Up),
            "down" | "south" => Ok(Direction::Down),
            "left" | "west" => Ok(Direction::Left),
            "right" | "east" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}
