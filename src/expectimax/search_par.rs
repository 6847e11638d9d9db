use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use ahash::RandomState as AHasher;
use dashmap::DashMap;
use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::engine::{Board, Move, Pos};

use super::heuristic::HeuristicConfig;
use super::{max_in_order, pick_best, unscored_branches, BranchEval, ExpectimaxConfig, ParThresholds, SearchStats, Turn, SPAWNS};

type TranspositionKey = (Board, u32, Turn);

/// Parallel Expectimax using rayon and a shared `DashMap` transposition table.
///
/// Children are collected in their sequential order before reducing, so the
/// scores (and the chosen move) match [`super::Expectimax`] bit for bit.
pub struct ExpectimaxParallel {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl ExpectimaxParallel {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self { Self { cfg, stats: SearchStats::default() } }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Compute the best move using parallel expectimax.
    ///
    /// This is a convenience wrapper around `branch_evals` that just picks the best move.
    pub fn best_move(&mut self, board: &Board) -> Option<Move> {
        let (best, _) = self.best_move_with_branches(board);
        best
    }

    /// Get both best move and all branch evaluations from one search.
    pub fn best_move_with_branches(&mut self, board: &Board) -> (Option<Move>, [BranchEval; 4]) {
        let start = Instant::now();
        let branches = self.branch_evals(board);
        let best = pick_best(&branches);
        match best {
            Some(b) => debug!(
                "best move {} ev={:.3} nodes={} cache_hits={} elapsed={:?}",
                b.dir,
                b.ev,
                self.stats.nodes,
                self.stats.cache_hits,
                start.elapsed()
            ),
            None => debug!("no legal move"),
        }
        (best.map(|b| b.dir), branches)
    }

    /// Compute EV for each direction (no normalization) in parallel.
    ///
    /// Returns a fixed array in order: `[Up, Down, Left, Right]` and marks
    /// illegal moves as `legal=false`.
    pub fn branch_evals(&mut self, board: &Board) -> [BranchEval; 4] {
        let search = self.search();
        let depth = self.cfg.depth;
        let scored: Vec<Option<f64>> = Move::ALL
            .par_iter()
            .map(|&dir| {
                let next = board.shift(dir);
                (next != *board).then(|| search.node(&next, depth, Turn::Chance))
            })
            .collect();
        let mut out = unscored_branches();
        for ((slot, dir), ev) in out.iter_mut().zip(Move::ALL).zip(scored) {
            if let Some(ev) = ev {
                trace!("branch {} ev={:.3}", dir, ev);
                *slot = BranchEval { dir, ev, legal: true };
            }
        }
        self.record(&search);
        out
    }

    /// EV at root (agent node): the best branch EV, or the static value when no move is legal.
    pub fn state_value(&mut self, board: &Board) -> f64 {
        match pick_best(&self.branch_evals(board)) {
            Some(b) => b.ev,
            None => self.cfg.heuristic.evaluate(board),
        }
    }

    /// Value of a single search node with `depth` plies remaining.
    pub fn expectimax(&mut self, board: &Board, depth: u32, turn: Turn) -> f64 {
        let search = self.search();
        let value = search.node(board, depth, turn);
        self.record(&search);
        value
    }

    /// Statistics collected from the last call to [`Self::best_move`],
    /// [`Self::branch_evals`], [`Self::state_value`] or [`Self::expectimax`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    fn search(&self) -> ParSearch {
        ParSearch {
            heuristic: self.cfg.heuristic,
            thresholds: self.cfg.par_thresholds,
            cache: self.cfg.cache_enabled.then(|| DashMap::with_hasher(AHasher::new())),
            cache_min_depth: self.cfg.cache_min_depth,
            deadline: self.cfg.time_budget.map(|budget| Instant::now() + budget),
            nodes: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            timed_out: AtomicBool::new(false),
        }
    }

    fn record(&mut self, search: &ParSearch) {
        let nodes = search.nodes.load(Ordering::Relaxed);
        let timed_out = search.timed_out.load(Ordering::Relaxed);
        if timed_out {
            warn!("time budget expired after {} nodes; using partial search", nodes);
        }
        self.stats = SearchStats {
            nodes,
            peak_nodes: self.stats.peak_nodes.max(nodes),
            cache_hits: search.cache_hits.load(Ordering::Relaxed),
            timed_out,
        };
    }
}

struct ParSearch {
    heuristic: HeuristicConfig,
    thresholds: ParThresholds,
    cache: Option<DashMap<TranspositionKey, f64, AHasher>>,
    cache_min_depth: u32,
    deadline: Option<Instant>,
    nodes: AtomicU64,
    cache_hits: AtomicU64,
    timed_out: AtomicBool,
}

impl ParSearch {
    fn node(&self, board: &Board, depth: u32, turn: Turn) -> f64 {
        self.nodes.fetch_add(1, Ordering::Relaxed);
        if depth == 0 || board.is_terminal() {
            return self.heuristic.evaluate(board);
        }
        if turn == Turn::Agent && self.expired() {
            return self.heuristic.evaluate(board);
        }
        let key = self.cache.is_some().then(|| (board.clone(), depth, turn));
        if let (Some(map), Some(key)) = (&self.cache, &key) {
            if let Some(score) = map.get(key).map(|entry| *entry) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return score;
            }
        }
        let score = match turn {
            Turn::Agent => self.evaluate_max_parallel(board, depth),
            Turn::Chance => self.evaluate_chance_parallel(board, depth),
        };
        if depth >= self.cache_min_depth && !self.timed_out.load(Ordering::Relaxed) {
            if let (Some(map), Some(key)) = (&self.cache, key) {
                map.insert(key, score);
            }
        }
        score
    }

    fn evaluate_max_parallel(&self, board: &Board, depth: u32) -> f64 {
        let child = |dir: Move| {
            let next = board.shift(dir);
            (next != *board).then(|| self.node(&next, depth - 1, Turn::Chance))
        };
        if depth >= self.thresholds.max_par_depth {
            let scores: Vec<Option<f64>> = Move::ALL.par_iter().map(|&dir| child(dir)).collect();
            max_in_order(scores.into_iter().flatten())
        } else {
            max_in_order(Move::ALL.into_iter().filter_map(child))
        }
    }

    fn evaluate_chance_parallel(&self, board: &Board, depth: u32) -> f64 {
        let empty = board.empty_cells();
        if empty.is_empty() {
            return self.heuristic.evaluate(board);
        }
        let ParThresholds { par_depth, par_slots, .. } = self.thresholds;
        let sum = if depth >= par_depth && empty.len() >= par_slots {
            let per_cell: Vec<f64> = empty.par_iter().map(|&pos| self.spawn_value(board, pos, depth)).collect();
            per_cell.into_iter().fold(0.0, |acc, v| acc + v)
        } else {
            empty.iter().fold(0.0, |acc, &pos| acc + self.spawn_value(board, pos, depth))
        };
        sum / empty.len() as f64
    }

    fn spawn_value(&self, board: &Board, pos: Pos, depth: u32) -> f64 {
        SPAWNS.iter().fold(0.0, |acc, &(tile, prob)| acc + prob * self.node(&board.with_tile(pos, tile), depth - 1, Turn::Agent))
    }

    fn expired(&self) -> bool {
        if self.timed_out.load(Ordering::Relaxed) {
            return true;
        }
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if expired {
            self.timed_out.store(true, Ordering::Relaxed);
        }
        expired
    }
}

impl Default for ExpectimaxParallel { fn default() -> Self { Self::new() } }
