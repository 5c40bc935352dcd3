//! Error type shared by the board engine and the state machine.
//!
//! Every variant is recoverable: the engine never panics on bad input, it
//! hands the condition back to the host which decides what to do next.

use thiserror::Error;

use crate::action::Action;

/// Errors raised at the boundary of the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// A host-supplied grid did not have the expected 4x4 shape.
    ///
    /// `cols` reports the length of the first offending row (or of the first
    /// row when the row count itself is wrong).
    #[error("malformed board: expected 4x4 grid, got {rows} rows x {cols} columns")]
    MalformedBoard {
        /// Number of rows supplied.
        rows: usize,
        /// Number of columns in the offending row.
        cols: usize,
    },

    /// A cell held an exponent larger than the engine accepts.
    #[error("tile exponent {value} at ({row}, {col}) exceeds the maximum of {max}", max = crate::board::MAX_EXPONENT)]
    TileOutOfRange {
        /// Row of the offending cell.
        row: usize,
        /// Column of the offending cell.
        col: usize,
        /// Exponent found in the cell.
        value: u8,
    },

    /// The action would not change the board.
    #[error("move {0:?} does not change the board")]
    IllegalMove(Action),

    /// A textual action did not name one of the four directions.
    #[error("unknown action: {0:?}")]
    UnknownAction(String),
}
