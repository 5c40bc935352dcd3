//! Move directions and grid coordinates.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// The four possible move directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    /// Convert a u8 to an Action (0=Up, 1=Down, 2=Left, 3=Right).
    /// Returns None for invalid values.
    pub fn from_u8(value: u8) -> Option<Action> {
        match value {
            0 => Some(Action::Up),
            1 => Some(Action::Down),
            2 => Some(Action::Left),
            3 => Some(Action::Right),
            _ => None,
        }
    }

    /// Get all four actions.
    pub fn all() -> [Action; 4] {
        [Action::Up, Action::Down, Action::Left, Action::Right]
    }

    /// Vertical moves are served by the transposed view.
    pub(crate) fn is_vertical(self) -> bool {
        matches!(self, Action::Up | Action::Down)
    }

    /// Moves toward the high column (or row) are served by the inverted view.
    pub(crate) fn is_reversed(self) -> bool {
        matches!(self, Action::Right | Action::Down)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
        };
        f.write_str(name)
    }
}

impl FromStr for Action {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Action::Up),
            "down" | "s" => Ok(Action::Down),
            "left" | "a" => Ok(Action::Left),
            "right" | "d" => Ok(Action::Right),
            _ => Err(GameError::UnknownAction(s.to_string())),
        }
    }
}

/// A logical (row, column) coordinate on the grid, both in `0..4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Position { row, col }
    }
}
