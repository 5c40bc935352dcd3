//! Immutable game snapshots and the turn transition.

use log::debug;
use rand::Rng;

use crate::action::Action;
use crate::board::Board;
use crate::error::GameError;

/// A board paired with the score accumulated to reach it.
///
/// Never mutated after construction; every accepted move yields a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    score: u64,
}

impl GameState {
    /// Opening position: an empty board with two random tiles, score 0.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut board = Board::empty();
        for _ in 0..2 {
            if let Some(spawned) = board.with_random_tile(rng) {
                board = spawned;
            }
        }
        GameState { board, score: 0 }
    }

    /// Start from a host-supplied board with score 0 and no spawn.
    pub fn from_board(board: Board) -> Self {
        GameState { board, score: 0 }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn possible_moves(&self) -> &[Action] {
        self.board.possible_moves()
    }

    /// No action changes the board.
    pub fn is_finished(&self) -> bool {
        self.board.is_terminal()
    }

    /// Largest real tile value on the board.
    pub fn max_tile(&self) -> u64 {
        self.board.max_tile()
    }

    /// Apply `action`, add its merge points, then spawn one tile.
    ///
    /// An action that leaves the board unchanged is rejected with
    /// [`GameError::IllegalMove`] and nothing is spawned. A failed spawn does
    /// not reject the move; fullness is left to [`GameState::is_finished`].
    pub fn next<R: Rng + ?Sized>(&self, action: Action, rng: &mut R) -> Result<GameState, GameError> {
        if !self.board.can_move(action) {
            debug!("rejected {:?}: board unchanged", action);
            return Err(GameError::IllegalMove(action));
        }

        let shifted = self.board.shift_scored(action);
        let board = match shifted.board.with_random_tile(rng) {
            Some(spawned) => spawned,
            None => shifted.board,
        };
        let score = self.score + shifted.gain;
        debug!("accepted {:?}: +{} (score {})", action, shifted.gain, score);

        Ok(GameState { board, score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn board(cells: [[u8; 4]; 4]) -> Board {
        Board::try_from(cells).unwrap()
    }

    #[test]
    fn test_initial_state() {
        for seed in 0..50 {
            let state = GameState::new(&mut SmallRng::seed_from_u64(seed));
            assert_eq!(state.board().non_empty_fields().len(), 2);
            assert_eq!(state.score(), 0);
            assert!(!state.is_finished());
        }
    }

    #[test]
    fn test_next_scores_merges_and_spawns() {
        let mut rng = SmallRng::seed_from_u64(3);
        let state = GameState::from_board(board([[0, 0, 1, 1], [0; 4], [0; 4], [0; 4]]));
        let next = state.next(Action::Left, &mut rng).unwrap();

        assert_eq!(next.score(), 4);
        assert_eq!(next.board().get(0, 0), 2);
        // the merged tile plus one spawn
        assert_eq!(next.board().non_empty_fields().len(), 2);
        // the original snapshot is untouched
        assert_eq!(state.score(), 0);
        assert_eq!(state.board().rows()[0], [0, 0, 1, 1]);
    }

    #[test]
    fn test_score_accumulates() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut state = GameState::new(&mut rng);
        let mut previous = state.score();
        for _ in 0..200 {
            let Some(&action) = state.possible_moves().first() else {
                break;
            };
            state = state.next(action, &mut rng).unwrap();
            assert!(state.score() >= previous);
            previous = state.score();
        }
    }

    #[test]
    fn test_noop_move_is_rejected_without_spawn() {
        let mut rng = SmallRng::seed_from_u64(5);
        let state = GameState::from_board(board([[1, 0, 0, 0], [0; 4], [0; 4], [0; 4]]));
        assert_eq!(
            state.next(Action::Left, &mut rng),
            Err(GameError::IllegalMove(Action::Left))
        );
        assert_eq!(state.board().non_empty_fields().len(), 1);
    }

    #[test]
    fn test_move_into_last_hole() {
        let mut rng = SmallRng::seed_from_u64(5);
        let state = GameState::from_board(board([
            [1, 2, 3, 0],
            [2, 3, 4, 5],
            [3, 4, 5, 6],
            [4, 5, 6, 7],
        ]));
        let next = state.next(Action::Right, &mut rng).unwrap();
        assert_eq!(&next.board().rows()[0][1..], &[1, 2, 3]);
        assert_ne!(next.board().get(0, 0), 0);
        assert_eq!(next.score(), 0);
        assert_eq!(next.board().empty_count(), 0);
    }

    #[test]
    fn test_finished_state_rejects_everything() {
        let mut rng = SmallRng::seed_from_u64(1);
        let state = GameState::from_board(board([
            [1, 2, 1, 2],
            [2, 1, 2, 1],
            [1, 2, 1, 2],
            [2, 1, 2, 1],
        ]));
        assert!(state.is_finished());
        for action in Action::all() {
            assert!(state.next(action, &mut rng).is_err());
        }
    }
}
