//! expectimax-2048: a 2048 board model + Expectimax move selection
//!
//! This crate provides:
//! - A validated N×N `Board` value type with pure transitions (`shift`, `legal_moves`, ...)
//! - A multi-feature heuristic with an explicit weight table (`expectimax::heuristic`)
//! - An Expectimax AI (`expectimax` module) with single-threaded and parallel variants
//! - A headless play loop for runners and benchmarks (`game` module)
//!
//! Collaborators (renderers, input loops, runners) only need the two entry
//! points re-exported here: [`decide`] and [`apply`].
//!
//! Quick start:
//! ```
//! use expectimax_2048::{apply, decide};
//! use expectimax_2048::engine::{Board, Move};
//!
//! let b = Board::from_rows(&[[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [2, 0, 0, 2]]).unwrap();
//! assert_eq!(apply(&b, Move::Left).row(3), &[4, 0, 0, 0]);
//! assert!(decide(&b).is_some());
//! ```
//!
//! Full loop (simplest possible)
//! ```
//! use expectimax_2048::engine::Board;
//! use expectimax_2048::expectimax::Expectimax;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut policy = Expectimax::new();
//! let mut rng = StdRng::seed_from_u64(123);
//! let mut b = Board::initial(4, &mut rng);
//! let mut moves = 0u32;
//!
//! // A couple of moves keeps doctests fast.
//! while moves < 3 {
//!     let Some(dir) = policy.best_move(&b) else { break };
//!     b = b.make_move(dir, &mut rng);
//!     moves += 1;
//! }
//! assert!(moves > 0 && b.score() >= 4);
//! ```

pub mod engine;
pub mod expectimax;
pub mod game;

use engine::{Board, Move};
use expectimax::Expectimax;

pub use engine::apply;

/// Best move for `board` under the reference configuration, or `None` when the game is over.
///
/// Every legal move is scored by an expectimax search (depth 3) starting from a
/// Chance layer on the post-move board. The strictly greatest score wins; ties
/// go to the first move in `[Up, Down, Left, Right]` order.
pub fn decide(board: &Board) -> Option<Move> { Expectimax::new().best_move(board) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decide_is_repeatable() {
        let b = Board::from_rows(&[[0, 2, 0, 0], [0, 0, 4, 0], [2, 0, 0, 0], [0, 0, 0, 8]]).unwrap();
        let first = decide(&b);
        assert!(first.is_some());
        for _ in 0..3 {
            assert_eq!(decide(&b), first);
        }
    }

    #[test]
    fn decide_on_checkerboard_is_none() {
        let b = Board::from_rows(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        assert_eq!(decide(&b), None);
    }
}
