use std::collections::HashMap;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::engine::{Board, Move, Pos};

use super::heuristic::HeuristicConfig;
use super::{max_in_order, pick_best, unscored_branches, BranchEval, ExpectimaxConfig, SearchStats, Turn, SPAWNS};

type TranspositionKey = (Board, u32, Turn);

/// Single-threaded Expectimax search.
pub struct Expectimax {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self { Self { cfg, stats: SearchStats::default() } }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Compute the best move using expectimax, or `None` when no move is legal.
    ///
    /// Example
    /// ```
    /// use expectimax_2048::engine::Board;
    /// use expectimax_2048::expectimax::Expectimax;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let b = Board::initial(4, &mut rng);
    /// let mut ex = Expectimax::new();
    /// assert!(ex.best_move(&b).is_some());
    /// ```
    pub fn best_move(&mut self, board: &Board) -> Option<Move> {
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
        best.map(|b| b.dir)
    }

    /// Compute EV for each direction (no normalization).
    ///
    /// Returns a fixed array in order: `[Up, Down, Left, Right]` and marks
    /// illegal moves as `legal=false`.
    ///
    /// Example
    /// ```
    /// use expectimax_2048::engine::Board;
    /// use expectimax_2048::expectimax::Expectimax;
    /// let b = Board::from_rows(&[[2, 0], [0, 0]]).unwrap();
    /// let branches = Expectimax::new().branch_evals(&b);
    /// assert_eq!(branches.iter().filter(|b| b.legal).count(), 2);
    /// ```
    pub fn branch_evals(&mut self, board: &Board) -> [BranchEval; 4] {
        let mut search = self.search();
        let mut out = unscored_branches();
        for (slot, dir) in out.iter_mut().zip(Move::ALL) {
            let next = board.shift(dir);
            if next != *board {
                let ev = search.node(&next, self.cfg.depth, Turn::Chance);
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
    ///
    /// With `depth == 0` this is exactly the heuristic value.
    pub fn expectimax(&mut self, board: &Board, depth: u32, turn: Turn) -> f64 {
        let mut search = self.search();
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

    fn search(&self) -> Search {
        Search {
            heuristic: self.cfg.heuristic,
            cache: self.cfg.cache_enabled.then(HashMap::new),
            cache_min_depth: self.cfg.cache_min_depth,
            deadline: self.cfg.time_budget.map(|budget| Instant::now() + budget),
            nodes: 0,
            cache_hits: 0,
            timed_out: false,
        }
    }

    fn record(&mut self, search: &Search) {
        if search.timed_out {
            warn!("time budget expired after {} nodes; using partial search", search.nodes);
        }
        self.stats = SearchStats {
            nodes: search.nodes,
            peak_nodes: self.stats.peak_nodes.max(search.nodes),
            cache_hits: search.cache_hits,
            timed_out: search.timed_out,
        };
    }
}

struct Search {
    heuristic: HeuristicConfig,
    cache: Option<HashMap<TranspositionKey, f64>>,
    cache_min_depth: u32,
    deadline: Option<Instant>,
    nodes: u64,
    cache_hits: u64,
    timed_out: bool,
}

impl Search {
    fn node(&mut self, board: &Board, depth: u32, turn: Turn) -> f64 {
        self.nodes += 1;
        if depth == 0 || board.is_terminal() {
            return self.heuristic.evaluate(board);
        }
        if turn == Turn::Agent && self.expired() {
            return self.heuristic.evaluate(board);
        }
        let key = self.cache.is_some().then(|| (board.clone(), depth, turn));
        if let (Some(map), Some(key)) = (&self.cache, &key) {
            if let Some(&score) = map.get(key) {
                self.cache_hits += 1;
                return score;
            }
        }
        let score = match turn {
            Turn::Agent => self.evaluate_max(board, depth),
            Turn::Chance => self.evaluate_chance(board, depth),
        };
        // Values computed past the deadline are truncated; never reuse them.
        if !self.timed_out && depth >= self.cache_min_depth {
            if let (Some(map), Some(key)) = (self.cache.as_mut(), key) {
                map.insert(key, score);
            }
        }
        score
    }

    fn evaluate_max(&mut self, board: &Board, depth: u32) -> f64 {
        let mut scores = Vec::with_capacity(Move::ALL.len());
        for dir in Move::ALL {
            let next = board.shift(dir);
            if next != *board {
                scores.push(self.node(&next, depth - 1, Turn::Chance));
            }
        }
        max_in_order(scores)
    }

    fn evaluate_chance(&mut self, board: &Board, depth: u32) -> f64 {
        let empty = board.empty_cells();
        if empty.is_empty() {
            return self.heuristic.evaluate(board);
        }
        let mut sum = 0.0;
        for &pos in &empty {
            sum += self.spawn_value(board, pos, depth);
        }
        sum / empty.len() as f64
    }

    /// Probability-weighted value of spawning each tile kind at `pos`.
    fn spawn_value(&mut self, board: &Board, pos: Pos, depth: u32) -> f64 {
        SPAWNS.iter().fold(0.0, |acc, &(tile, prob)| acc + prob * self.node(&board.with_tile(pos, tile), depth - 1, Turn::Agent))
    }

    fn expired(&mut self) -> bool {
        if !self.timed_out {
            self.timed_out = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        }
        self.timed_out
    }
}

impl Default for Expectimax { fn default() -> Self { Self::new() } }
