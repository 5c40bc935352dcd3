//! The mutable cursor a host drives.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::action::Action;
use crate::board::Board;
use crate::error::GameError;
use crate::state::GameState;

/// Result of executing a step (move) in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Whether the move was accepted (and a new tile was spawned).
    pub changed: bool,
    /// Points earned from merges in this move.
    pub reward: u64,
    /// Whether the game is over (no legal moves remaining).
    pub done: bool,
}

/// Holds the current [`GameState`] and the random source for spawns.
///
/// Each accepted move replaces the state wholesale; no history is kept.
#[derive(Debug, Clone)]
pub struct Game<R = SmallRng> {
    state: GameState,
    rng: R,
}

impl Game<SmallRng> {
    /// Create a new game whose spawns are driven by `seed`.
    pub fn new(seed: u64) -> Self {
        Game::with_rng(SmallRng::seed_from_u64(seed))
    }

    /// Reset to a fresh opening position with a new seed.
    pub fn reset_with_seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
        self.reset();
    }
}

impl<R: Rng> Game<R> {
    /// Create a new game drawing spawns from `rng`.
    pub fn with_rng(mut rng: R) -> Self {
        let state = GameState::new(&mut rng);
        Game { state, rng }
    }

    /// Resume play from a host-supplied board (score 0, no spawn).
    pub fn from_board(board: Board, rng: R) -> Self {
        Game {
            state: GameState::from_board(board),
            rng,
        }
    }

    /// Discard the current state and start over from two random tiles.
    pub fn reset(&mut self) {
        self.state = GameState::new(&mut self.rng);
        debug!("game reset");
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        self.state.board()
    }

    pub fn score(&self) -> u64 {
        self.state.score()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn possible_moves(&self) -> &[Action] {
        self.state.possible_moves()
    }

    /// Advance by `action`. An action that would not change the board is
    /// rejected and the current state is kept.
    pub fn next(&mut self, action: Action) -> Result<&GameState, GameError> {
        self.state = self.state.next(action, &mut self.rng)?;
        Ok(&self.state)
    }

    /// Like [`Game::next`], but folds a rejected action into
    /// `changed: false` instead of an error.
    pub fn step(&mut self, action: Action) -> StepResult {
        let before = self.state.score();
        let changed = self.next(action).is_ok();
        StepResult {
            changed,
            reward: self.state.score() - before,
            done: self.is_finished(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Spawn determinism tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_spawn_determinism() {
        let seed = 12345u64;
        let game1 = Game::new(seed);
        let game2 = Game::new(seed);

        assert_eq!(game1.board(), game2.board());
        assert_eq!(game1.score(), game2.score());
    }

    #[test]
    fn test_step_determinism() {
        let seed = 54321u64;
        let mut game1 = Game::new(seed);
        let mut game2 = Game::new(seed);

        let actions = [Action::Left, Action::Up, Action::Right, Action::Down];
        for action in actions {
            game1.step(action);
            game2.step(action);
            assert_eq!(game1.board(), game2.board());
            assert_eq!(game1.score(), game2.score());
        }
    }

    #[test]
    fn test_different_seeds_different_games() {
        let boards: Vec<Board> = (0..8).map(|seed| Game::new(seed).board().clone()).collect();
        assert!(boards.iter().any(|b| *b != boards[0]));
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    #[test]
    fn test_next_replaces_state() {
        let board = Board::try_from([[1, 1, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut game = Game::from_board(board, SmallRng::seed_from_u64(1));

        let state = game.next(Action::Left).unwrap();
        assert_eq!(state.score(), 4);
        assert_eq!(state.board().get(0, 0), 2);
        assert_eq!(game.score(), 4);
    }

    #[test]
    fn test_next_rejects_noop_and_keeps_state() {
        let board = Board::try_from([[1, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut game = Game::from_board(board.clone(), SmallRng::seed_from_u64(1));

        assert_eq!(game.next(Action::Up).err(), Some(GameError::IllegalMove(Action::Up)));
        assert_eq!(game.board(), &board);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_step_no_change_no_spawn() {
        let board = Board::try_from([[1, 0, 0, 0], [2, 0, 0, 0], [3, 0, 0, 0], [4, 0, 0, 0]]).unwrap();
        let mut game = Game::from_board(board.clone(), SmallRng::seed_from_u64(0));
        let result = game.step(Action::Left);

        assert!(!result.changed);
        assert_eq!(result.reward, 0);
        assert!(!result.done);
        assert_eq!(game.board(), &board);
    }

    #[test]
    fn test_step_reports_reward() {
        let board = Board::try_from([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut game = Game::from_board(board, SmallRng::seed_from_u64(0));
        let result = game.step(Action::Right);

        assert!(result.changed);
        assert_eq!(result.reward, 8);
        assert_eq!(game.board().get(0, 3), 3);
    }

    // -------------------------------------------------------------------------
    // Game over detection
    // -------------------------------------------------------------------------

    #[test]
    fn test_game_not_over_at_start() {
        let game = Game::new(42);
        assert!(!game.is_finished());
        assert!(!game.possible_moves().is_empty());
    }

    #[test]
    fn test_game_over_no_moves() {
        let board = Board::try_from([[1, 2, 1, 2], [2, 1, 2, 1], [1, 2, 1, 2], [2, 1, 2, 1]]).unwrap();
        let mut game = Game::from_board(board, SmallRng::seed_from_u64(0));
        assert!(game.is_finished());
        assert!(game.possible_moves().is_empty());

        let result = game.step(Action::Down);
        assert!(!result.changed);
        assert!(result.done);
    }

    #[test]
    fn test_play_until_finished() {
        let mut game = Game::new(7);
        let mut steps = 0;
        while let Some(&action) = game.possible_moves().first() {
            game.next(action).unwrap();
            steps += 1;
            assert!(steps < 100_000);
        }
        assert!(game.is_finished());
        assert!(game.score() > 0);
    }

    // -------------------------------------------------------------------------
    // Reset
    // -------------------------------------------------------------------------

    #[test]
    fn test_reset_with_seed() {
        let mut game = Game::new(42);
        game.step(Action::Left);
        game.step(Action::Up);

        game.reset_with_seed(42);
        let fresh_game = Game::new(42);

        assert_eq!(game.board(), fresh_game.board());
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_reset_keeps_rng_stream() {
        let board = Board::try_from([[5, 5, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut game = Game::from_board(board, SmallRng::seed_from_u64(9));
        game.next(Action::Left).unwrap();
        assert!(game.score() > 0);

        game.reset();
        assert_eq!(game.score(), 0);
        assert_eq!(game.board().non_empty_fields().len(), 2);
    }
}
