//! Static board evaluation used at the leaves of the search.
//!
//! The score is a weighted sum of seven independent features. Each feature is
//! its own function so it can be inspected or re-weighted in isolation; the
//! weights live in [`Weights`] rather than in the feature code.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{Board, Pos, Tile, MAX_TILE};

/// Coefficient applied to each feature. Defaults are the reference tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub empty: f64,
    pub score: f64,
    pub monotonicity: f64,
    pub smoothness: f64,
    pub corner: f64,
    pub closeness: f64,
    pub merge: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            empty: 17.9,
            score: 14.8,
            monotonicity: 7.9,
            smoothness: 4.9,
            corner: 16.9,
            closeness: 17.3,
            merge: 14.8,
        }
    }
}

/// Corner the corner-affinity feature pulls large tiles toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl Corner {
    /// Cell coordinates of this corner on a `size`×`size` board.
    pub fn pos(self, size: usize) -> Pos {
        let last = size - 1;
        match self {
            Corner::TopLeft => Pos::new(0, 0),
            Corner::TopRight => Pos::new(last, 0),
            Corner::BottomLeft => Pos::new(0, last),
            Corner::BottomRight => Pos::new(last, last),
        }
    }
}

/// Everything the evaluator needs: weights plus the preferred corner.
///
/// Loadable from TOML; missing keys keep their defaults.
///
/// ```
/// use expectimax_2048::expectimax::heuristic::{Corner, HeuristicConfig};
/// let cfg = HeuristicConfig::from_toml_str("corner = \"top_left\"\n[weights]\nempty = 20.0\n").unwrap();
/// assert_eq!(cfg.corner, Corner::TopLeft);
/// assert_eq!(cfg.weights.empty, 20.0);
/// assert_eq!(cfg.weights.merge, 14.8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub weights: Weights,
    pub corner: Corner,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid heuristic config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HeuristicConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(text)?) }

    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Heuristic value of `board`; higher is better.
    #[inline]
    pub fn evaluate(&self, board: &Board) -> f64 { Features::of(board, self.corner).weighted(&self.weights) }
}

/// Heuristic value of `board` under the default weights and corner.
pub fn evaluate(board: &Board) -> f64 { HeuristicConfig::default().evaluate(board) }

/// Raw (unweighted) feature values for one board.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Features {
    pub empty: f64,
    pub score: f64,
    pub monotonicity: f64,
    pub smoothness: f64,
    pub corner: f64,
    pub closeness: f64,
    pub merge: f64,
}

impl Features {
    pub fn of(board: &Board, corner: Corner) -> Self {
        Self {
            empty: calc_empty(board),
            score: calc_sum(board),
            monotonicity: calc_monotonicity(board),
            smoothness: calc_smoothness(board),
            corner: calc_corner(board, corner),
            closeness: calc_closeness(board),
            merge: calc_merges(board),
        }
    }

    pub fn weighted(&self, w: &Weights) -> f64 {
        w.empty * self.empty
            + w.score * self.score
            + w.monotonicity * self.monotonicity
            + w.smoothness * self.smoothness
            + w.corner * self.corner
            + w.closeness * self.closeness
            + w.merge * self.merge
    }
}

pub fn calc_empty(board: &Board) -> f64 { board.count_empty() as f64 }

pub fn calc_sum(board: &Board) -> f64 { board.score() as f64 }

/// Sum over rows and columns of the longer of the non-decreasing and
/// non-increasing pair counts. Equal pairs count toward both.
pub fn calc_monotonicity(board: &Board) -> f64 {
    let transposed = board.transpose();
    (0..board.size())
        .map(|i| line_monotonicity(board.row(i)) + line_monotonicity(transposed.row(i)))
        .sum::<usize>() as f64
}

fn line_monotonicity(line: &[Tile]) -> usize {
    let (increasing, decreasing) = line.windows(2).fold((0, 0), |(inc, dec), pair| {
        (inc + usize::from(pair[0] <= pair[1]), dec + usize::from(pair[0] >= pair[1]))
    });
    increasing.max(decreasing)
}

/// Negated total difference between adjacent non-empty cells.
pub fn calc_smoothness(board: &Board) -> f64 {
    let transposed = board.transpose();
    let line_roughness = |line: &[Tile]| -> f64 {
        line.windows(2)
            .filter(|pair| pair[0] != 0 && pair[1] != 0)
            .map(|pair| pair[0].abs_diff(pair[1]) as f64)
            .sum()
    };
    let roughness: f64 = (0..board.size()).map(|i| line_roughness(board.row(i)) + line_roughness(transposed.row(i))).sum();
    -roughness
}

/// Tiles weighted by closeness to `corner`, boosted 1.5× when the corner holds the max tile.
pub fn calc_corner(board: &Board, corner: Corner) -> f64 {
    const CORNER_BONUS: f64 = 1.5;
    let target = corner.pos(board.size());
    let affinity: f64 = board
        .tiles()
        .filter(|&(_, v)| v > 0)
        .map(|(pos, v)| v as f64 / (pos.manhattan(target) + 1) as f64)
        .sum();
    if board.get(target) == board.highest_tile() { affinity * CORNER_BONUS } else { affinity }
}

/// Adjacent pairs among the three highest tiles (equal values keep row-major order).
pub fn calc_closeness(board: &Board) -> f64 {
    let mut tiles: Vec<(Pos, Tile)> = board.tiles().filter(|&(_, v)| v != 0).collect();
    if tiles.len() < 2 {
        return 0.0;
    }
    // Stable, so ties stay in row-major order.
    tiles.sort_by(|a, b| b.1.cmp(&a.1));
    let top = &tiles[..tiles.len().min(3)];
    let mut adjacent = 0;
    for (i, &(a, _)) in top.iter().enumerate() {
        for &(b, _) in &top[i + 1..] {
            if a.manhattan(b) == 1 {
                adjacent += 1;
            }
        }
    }
    adjacent as f64
}

/// Each non-empty cell adds its own value once per equal right or below neighbour.
/// Pairs of [`MAX_TILE`] cannot merge and are skipped.
pub fn calc_merges(board: &Board) -> f64 {
    let n = board.size();
    let cells = board.cells();
    let mut merges = 0.0;
    for (pos, v) in board.tiles().filter(|&(_, v)| v > 0 && v < MAX_TILE) {
        let idx = pos.row * n + pos.col;
        if pos.col + 1 < n && cells[idx + 1] == v {
            merges += v as f64;
        }
        if pos.row + 1 < n && cells[idx + n] == v {
            merges += v as f64;
        }
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[[Tile; 4]]) -> Board { Board::from_rows(rows).unwrap() }

    #[test]
    fn empty_board_features() {
        let f = Features::of(&Board::new(4), Corner::BottomRight);
        assert_eq!(f.empty, 16.0);
        assert_eq!(f.score, 0.0);
        // 8 lines, 3 pairs each, every pair counts both ways.
        assert_eq!(f.monotonicity, 24.0);
        assert_eq!(f.smoothness, 0.0);
        assert_eq!(f.corner, 0.0);
        assert_eq!(f.closeness, 0.0);
        assert_eq!(f.merge, 0.0);
        assert!((evaluate(&Board::new(4)) - (17.9 * 16.0 + 7.9 * 24.0)).abs() < 1e-9);
    }

    #[test]
    fn bottom_pair_features() {
        let b = board(&[[0; 4], [0; 4], [0; 4], [2, 0, 0, 2]]);
        let f = Features::of(&b, Corner::BottomRight);
        assert_eq!(f.empty, 14.0);
        assert_eq!(f.score, 4.0);
        assert_eq!(f.monotonicity, 23.0);
        assert_eq!(f.smoothness, 0.0);
        assert!((f.corner - 3.75).abs() < 1e-12);
        assert_eq!(f.closeness, 0.0);
        assert_eq!(f.merge, 0.0);
    }

    #[test]
    fn clustered_corner_features() {
        let b = board(&[[0; 4], [0; 4], [0, 0, 4, 4], [0, 0, 2, 8]]);
        assert_eq!(calc_merges(&b), 4.0);
        assert_eq!(calc_closeness(&b), 2.0);
        assert_eq!(calc_smoothness(&b), -12.0);
    }

    #[test]
    fn merge_counts_each_direction_once() {
        let b = board(&[[2, 2, 0, 0], [2, 0, 0, 0], [0; 4], [0; 4]]);
        // (0,0) matches right and below; (1,0) has no equal neighbour.
        assert_eq!(calc_merges(&b), 4.0);
    }

    #[test]
    fn closeness_ties_follow_row_major_order() {
        let b = board(&[[2, 2, 0, 2], [0; 4], [0; 4], [0, 0, 0, 2]]);
        assert_eq!(calc_closeness(&b), 1.0);
    }

    #[test]
    fn corner_without_bonus() {
        let b = board(&[[8, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 2]]);
        assert!((calc_corner(&b, Corner::BottomRight) - (8.0 / 7.0 + 2.0)).abs() < 1e-12);
        assert!((calc_corner(&b, Corner::TopLeft) - (8.0 + 2.0 / 7.0) * 1.5).abs() < 1e-12);
    }

    #[test]
    fn monotonic_rows_score_full() {
        let b = board(&[[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        // row 0 fully increasing, rows 1-3 trivially monotonic, columns all non-increasing.
        assert_eq!(calc_monotonicity(&b), 24.0);
        let zigzag = board(&[[2, 8, 2, 8], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(calc_monotonicity(&zigzag), 23.0);
    }

    #[test]
    fn weighted_sum_uses_every_weight() {
        let f = Features { empty: 1.0, score: 1.0, monotonicity: 1.0, smoothness: 1.0, corner: 1.0, closeness: 1.0, merge: 1.0 };
        let w = Weights::default();
        let total = w.empty + w.score + w.monotonicity + w.smoothness + w.corner + w.closeness + w.merge;
        assert!((f.weighted(&w) - total).abs() < 1e-9);
        let zero = Weights { empty: 0.0, score: 0.0, monotonicity: 0.0, smoothness: 0.0, corner: 0.0, closeness: 0.0, merge: 0.0 };
        assert_eq!(f.weighted(&zero), 0.0);
    }

    #[test]
    fn corner_positions() {
        assert_eq!(Corner::BottomRight.pos(4), Pos::new(3, 3));
        assert_eq!(Corner::TopRight.pos(5), Pos::new(4, 0));
        assert_eq!(Corner::BottomLeft.pos(3), Pos::new(0, 2));
    }

    #[test]
    fn largest_tiles_evaluate_finite() {
        let b = Board::from_rows(&[[MAX_TILE, MAX_TILE], [MAX_TILE / 2, MAX_TILE / 2]]).unwrap();
        let f = Features::of(&b, Corner::TopLeft);
        assert_eq!(f.score, 3.0 * MAX_TILE as f64);
        // Only the lower pair can still merge.
        assert_eq!(f.merge, MAX_TILE as f64 / 2.0);
        assert_eq!(f.smoothness, -(MAX_TILE as f64));
        assert!(evaluate(&b).is_finite());
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(HeuristicConfig::from_toml_str("weights = 3"), Err(ConfigError::Toml(_))));
        assert_eq!(HeuristicConfig::from_toml_str("").unwrap(), HeuristicConfig::default());
    }
}
