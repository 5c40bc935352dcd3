//! # Merge Puzzle Rules Engine
//!
//! Rules for the 4x4 sliding-tile merge puzzle: the board, the slide-and-merge
//! move, random spawns, and the turn-by-turn state transition. Randomness is
//! always injected, so seeded games are reproducible.
//!
//! Cells store exponents: `0` is empty and `v` is a tile showing `2^v`.
//!
//! ## Example
//!
//! ```rust
//! use merge_2048_core::{Action, Game};
//!
//! let mut game = Game::new(42); // seeded game
//! let action = game.possible_moves()[0];
//! let state = game.next(action).unwrap();
//! println!("Score: {}, finished: {}", state.score(), state.is_finished());
//!
//! // Illegal moves are rejected rather than applied.
//! let _ = game.next(Action::Left);
//! ```

pub mod action;
pub mod board;
pub mod error;
pub mod game;
pub mod state;

pub use action::{Action, Position};
pub use board::{map_coordinates, tile_value, Board, Shift, View, MAX_EXPONENT, SIZE};
pub use error::GameError;
pub use game::{Game, StepResult};
pub use state::GameState;
