//! Expectimax search policy (single-threaded and parallel) for 2048.
//!
//! This module provides two policy implementations:
//! - [`Expectimax`]: single-threaded expectimax.
//! - [`ExpectimaxParallel`]: rayon-based parallel expectimax.
//!
//! Both share the same public surface and defaults and return identical
//! scores for the same board: siblings are reduced in [`Move::ALL`] /
//! row-major order whichever thread computed them.
//!
//! Notes
//! - Search is deterministic; randomness only occurs when applying moves
//!   with `Board::make_move` or `Board::with_random_tile`.
//! - The post-move board is scored from a Chance layer, since a tile spawns
//!   before the agent acts again.
//!
//! Quick start
//! ```
//! use expectimax_2048::engine::Board;
//! use expectimax_2048::expectimax::{Expectimax, ExpectimaxParallel};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let b0 = Board::initial(4, &mut rng);
//!
//! let mut ex = Expectimax::new();
//! let m = ex.best_move(&b0);
//! assert!(m.is_some());
//!
//! let mut ex_par = ExpectimaxParallel::new();
//! assert_eq!(ex_par.best_move(&b0), m);
//! ```

use std::time::Duration;

use crate::engine::{Board, Move, Tile};

pub mod heuristic;
mod search_par;
mod search_seq;

pub use heuristic::{Corner, HeuristicConfig, Weights};
pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Spawned tile values and their probabilities.
pub(crate) const SPAWNS: [(Tile, f64); 2] = [(2, 0.9), (4, 0.1)];

/// Configurable knobs for Expectimax.
///
/// - `depth`: plies searched below the post-move board (reference: 3).
/// - `cache_enabled`: enable/disable the transposition table.
/// - `cache_min_depth`: only nodes with at least this many plies left are cached.
/// - `time_budget`: optional per-decision deadline; once passed, Agent nodes
///   stop expanding and the best answer so far is returned.
/// - `heuristic`: leaf evaluation weights and preferred corner.
/// - `par_thresholds`: thresholds used only by the parallel implementation.
#[derive(Debug, Clone)]
pub struct ExpectimaxConfig {
    pub depth: u32,
    pub cache_enabled: bool,
    pub cache_min_depth: u32,
    pub time_budget: Option<Duration>,
    pub heuristic: HeuristicConfig,
    pub par_thresholds: ParThresholds,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            cache_enabled: true,
            cache_min_depth: 1,
            time_budget: None,
            heuristic: HeuristicConfig::default(),
            par_thresholds: ParThresholds::default(),
        }
    }
}

/// Thresholds used to balance parallel overheads.
///
/// Siblings are fanned out only while remaining depth is at least the given
/// value (and, for chance nodes, there are enough empty slots).
#[derive(Debug, Clone, Copy)]
pub struct ParThresholds {
    pub max_par_depth: u32,
    pub par_depth: u32,
    pub par_slots: usize,
}

impl Default for ParThresholds {
    fn default() -> Self {
        Self { max_par_depth: 2, par_depth: 2, par_slots: 4 }
    }
}

/// Whose turn a search node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    /// The player picks the best legal move.
    Agent,
    /// The game spawns a 2 or 4 on an empty cell.
    Chance,
}

/// Per-branch expected value at the root (no normalization).
///
/// - `ev` is the expected value for taking `dir` from the current board.
/// - `legal` is false when the move is a no-op for the current board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub dir: Move,
    pub ev: f64,
    pub legal: bool,
}

/// Basic search stats for a single evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub peak_nodes: u64,
    pub cache_hits: u64,
    pub timed_out: bool,
}

/// Anything that can pick a move for a board.
pub trait Policy {
    fn best_move(&mut self, board: &Board) -> Option<Move>;

    /// Statistics for the most recent call.
    fn last_stats(&self) -> SearchStats;
}

impl Policy for Expectimax {
    fn best_move(&mut self, board: &Board) -> Option<Move> { Expectimax::best_move(self, board) }
    fn last_stats(&self) -> SearchStats { Expectimax::last_stats(self) }
}

impl Policy for ExpectimaxParallel {
    fn best_move(&mut self, board: &Board) -> Option<Move> { ExpectimaxParallel::best_move(self, board) }
    fn last_stats(&self) -> SearchStats { ExpectimaxParallel::last_stats(self) }
}

/// All four branches marked illegal, in [`Move::ALL`] order.
fn unscored_branches() -> [BranchEval; 4] { Move::ALL.map(|dir| BranchEval { dir, ev: 0.0, legal: false }) }

/// Legal branch with the strictly greatest EV; the first one wins ties.
pub fn pick_best(branches: &[BranchEval]) -> Option<BranchEval> {
    branches.iter().filter(|b| b.legal).fold(None, |best: Option<BranchEval>, &b| match best {
        Some(cur) if b.ev <= cur.ev => Some(cur),
        _ => Some(b),
    })
}

/// Strict-greater max in iteration order; `NEG_INFINITY` when empty.
fn max_in_order<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().fold(f64::NEG_INFINITY, |best, v| if v > best { v } else { best })
}
