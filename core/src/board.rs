//! The 4x4 board and its single slide-and-merge routine.
//!
//! Cells hold tile exponents: 0 is empty, `v > 0` is a tile showing `2^v`.
//! The stored grid is never rearranged. All four directions run the same
//! left slide through a [`View`] that remaps logical coordinates onto the
//! physical cells: inversion mirrors columns, transposition swaps rows and
//! columns.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use log::trace;
use rand::Rng;

use crate::action::{Action, Position};
use crate::error::GameError;

/// Side length of the grid.
pub const SIZE: usize = 4;

/// Largest exponent accepted from host-supplied grids (tile `2^31`).
pub const MAX_EXPONENT: u8 = 31;

/// Probability that a spawned tile is a 2 (exponent 1) rather than a 4.
pub const SPAWN_TWO_PROBABILITY: f32 = 0.9;

type Cells = [[u8; SIZE]; SIZE];

/// Map a logical coordinate to its physical cell.
///
/// Inversion is applied first (`col -> 3 - col`), then transposition swaps
/// the pair.
pub fn map_coordinates(row: usize, col: usize, transposed: bool, inverted: bool) -> (usize, usize) {
    let col = if inverted { SIZE - 1 - col } else { col };
    if transposed {
        (col, row)
    } else {
        (row, col)
    }
}

/// Orientation flags over a physical grid.
///
/// Toggling either flag twice restores the original mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct View {
    pub transposed: bool,
    pub inverted: bool,
}

impl View {
    /// The identity view.
    pub const NEUTRAL: View = View {
        transposed: false,
        inverted: false,
    };

    /// The view under which `action` becomes a left slide.
    pub fn for_action(action: Action) -> View {
        let mut view = View::NEUTRAL;
        if action.is_vertical() {
            view.toggle_transpose();
        }
        if action.is_reversed() {
            view.toggle_invert();
        }
        view
    }

    pub fn toggle_transpose(&mut self) {
        self.transposed = !self.transposed;
    }

    pub fn toggle_invert(&mut self) {
        self.inverted = !self.inverted;
    }

    #[inline]
    pub fn map(self, row: usize, col: usize) -> (usize, usize) {
        map_coordinates(row, col, self.transposed, self.inverted)
    }
}

/// Mutable cells while a board is being built; frozen into a [`Board`]
/// before anyone else can see it.
#[derive(Clone, Copy)]
struct Grid {
    cells: Cells,
}

impl Grid {
    const EMPTY: Grid = Grid {
        cells: [[0; SIZE]; SIZE],
    };

    #[inline]
    fn get(&self, view: View, row: usize, col: usize) -> u8 {
        let (r, c) = view.map(row, col);
        self.cells[r][c]
    }

    #[inline]
    fn set(&mut self, view: View, row: usize, col: usize, value: u8) {
        let (r, c) = view.map(row, col);
        self.cells[r][c] = value;
    }

    /// Place a 2 (90%) or a 4 (10%) on a uniformly chosen empty cell.
    /// Returns false when the grid is full.
    fn spawn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let empty: Vec<Position> = positions()
            .filter(|p| self.cells[p.row][p.col] == 0)
            .collect();

        if empty.is_empty() {
            return false;
        }

        let pos = empty[rng.gen_range(0..empty.len())];
        let value = if rng.gen::<f32>() < SPAWN_TWO_PROBABILITY { 1 } else { 2 };
        trace!("spawned exponent {} at ({}, {})", value, pos.row, pos.col);
        self.set(View::NEUTRAL, pos.row, pos.col, value);
        true
    }

    fn freeze(self) -> Board {
        Board {
            cells: self.cells,
            moves: OnceLock::new(),
        }
    }
}

/// Slide every logical row of `source` to the left under `view`, merging
/// equal neighbours once. Returns the result and the points earned.
fn slide(source: &Grid, view: View) -> (Grid, u64) {
    let mut result = Grid::EMPTY;
    let mut gain = 0u64;

    for row in 0..SIZE {
        let mut index = 0;
        let mut last = 0u8;
        for col in 0..SIZE {
            let value = source.get(view, row, col);
            if value == 0 {
                continue;
            }
            if value == last {
                let merged = last + 1;
                result.set(view, row, index - 1, merged);
                gain += tile_value(merged);
                // a third equal tile must not join this merge
                last = 0;
            } else {
                result.set(view, row, index, value);
                last = value;
                index += 1;
            }
        }
        for col in index..SIZE {
            result.set(view, row, col, 0);
        }
    }

    (result, gain)
}

fn positions() -> impl Iterator<Item = Position> {
    (0..SIZE).flat_map(|row| (0..SIZE).map(move |col| Position::new(row, col)))
}

/// Real value of a tile exponent (`0` for an empty cell).
#[inline]
pub fn tile_value(exponent: u8) -> u64 {
    if exponent == 0 {
        0
    } else {
        1u64 << exponent
    }
}

/// Outcome of a move: the new board and the points its merges earned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub board: Board,
    pub gain: u64,
}

/// An immutable 4x4 board.
///
/// Equality and hashing cover the cells only. The set of playable moves is
/// computed on first request and kept for the lifetime of the value.
#[derive(Clone, Default)]
pub struct Board {
    cells: Cells,
    moves: OnceLock<Vec<Action>>,
}

impl Board {
    /// A board with no tiles.
    pub fn empty() -> Board {
        Grid::EMPTY.freeze()
    }

    /// Build a board from host-supplied rows of exponents.
    ///
    /// Rejects anything that is not exactly 4x4 and any exponent above
    /// [`MAX_EXPONENT`].
    pub fn from_rows<T: AsRef<[u8]>>(rows: &[T]) -> Result<Board, GameError> {
        if rows.len() != SIZE {
            return Err(GameError::MalformedBoard {
                rows: rows.len(),
                cols: rows.first().map_or(0, |r| r.as_ref().len()),
            });
        }

        let mut grid = Grid::EMPTY;
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != SIZE {
                return Err(GameError::MalformedBoard {
                    rows: rows.len(),
                    cols: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                if value > MAX_EXPONENT {
                    return Err(GameError::TileOutOfRange { row, col, value });
                }
                grid.set(View::NEUTRAL, row, col, value);
            }
        }
        Ok(grid.freeze())
    }

    /// Exponent at a logical coordinate. Panics if either index is `>= 4`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    /// Copy of the grid, row-major.
    pub fn rows(&self) -> [[u8; SIZE]; SIZE] {
        self.cells
    }

    /// The board after sliding toward `action` (no spawn).
    pub fn shift(&self, action: Action) -> Board {
        self.shift_scored(action).board
    }

    /// Like [`Board::shift`], also reporting the points earned by merges.
    pub fn shift_scored(&self, action: Action) -> Shift {
        let source = Grid { cells: self.cells };
        let (result, gain) = slide(&source, View::for_action(action));
        Shift {
            board: result.freeze(),
            gain,
        }
    }

    /// Actions that change this board, in [`Action::all`] order.
    pub fn possible_moves(&self) -> &[Action] {
        self.moves.get_or_init(|| {
            Action::all()
                .into_iter()
                .filter(|&action| self.shift(action) != *self)
                .collect()
        })
    }

    /// Whether `action` would change the board.
    pub fn can_move(&self, action: Action) -> bool {
        self.possible_moves().contains(&action)
    }

    /// No direction changes the board.
    pub fn is_terminal(&self) -> bool {
        self.possible_moves().is_empty()
    }

    /// A copy of this board with one random tile added, or `None` when full.
    pub fn with_random_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Board> {
        let mut grid = Grid { cells: self.cells };
        if grid.spawn(rng) {
            Some(grid.freeze())
        } else {
            None
        }
    }

    fn fields<F: Fn(u8) -> bool>(&self, filter: F) -> BTreeSet<Position> {
        positions()
            .filter(|p| filter(self.cells[p.row][p.col]))
            .collect()
    }

    pub fn empty_fields(&self) -> BTreeSet<Position> {
        self.fields(|v| v == 0)
    }

    pub fn non_empty_fields(&self) -> BTreeSet<Position> {
        self.fields(|v| v != 0)
    }

    pub fn all_fields(&self) -> BTreeSet<Position> {
        self.fields(|_| true)
    }

    /// Number of empty cells.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v == 0).count()
    }

    /// Largest real tile value on the board (0 when empty).
    pub fn max_tile(&self) -> u64 {
        self.cells
            .iter()
            .flatten()
            .map(|&v| tile_value(v))
            .max()
            .unwrap_or(0)
    }

    /// Sum of the real tile values. Moves preserve it; spawns raise it.
    pub fn tile_sum(&self) -> u64 {
        self.cells.iter().flatten().map(|&v| tile_value(v)).sum()
    }
}

impl TryFrom<[[u8; SIZE]; SIZE]> for Board {
    type Error = GameError;

    fn try_from(cells: [[u8; SIZE]; SIZE]) -> Result<Self, Self::Error> {
        Board::from_rows(&cells)
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cells.hash(state);
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{")?;
        for row in &self.cells {
            for &val in row {
                if val == 0 {
                    write!(f, "    .")?;
                } else {
                    write!(f, "{:5}", tile_value(val))?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------+------+------+------+")?;
        for row in &self.cells {
            write!(f, "|")?;
            for &val in row {
                if val == 0 {
                    write!(f, "      |")?;
                } else {
                    write!(f, "{:^6}|", tile_value(val))?;
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        Ok(())
    }
}
