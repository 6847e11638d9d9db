//! Headless game loop: ask a policy for a move, apply it, spawn a tile, repeat.
//!
//! This is the collaborator side of the engine. The search never sees the RNG;
//! only the real spawn after each move does.

use rand::Rng;

use crate::engine::{Board, Move, Score, Tile};
use crate::expectimax::Policy;

/// Optional early-stop conditions for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameLimits {
    /// Stop after this many moves.
    pub steps: Option<u64>,
    /// Stop once the highest tile reaches this value.
    pub stop_tile: Option<Tile>,
}

/// Summary of one finished (or stopped) game.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub moves: u64,
    pub final_board: Board,
    pub score: Score,
    pub highest_tile: Tile,
    pub game_over: bool,
    pub total_nodes: u64,
    pub peak_nodes: u64,
}

/// Play from `start` until no move is legal or a limit is hit.
///
/// `on_move` sees every move together with the board after the spawn.
///
/// ```
/// use expectimax_2048::engine::Board;
/// use expectimax_2048::expectimax::{Expectimax, ExpectimaxConfig};
/// use expectimax_2048::game::{play, GameLimits};
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut rng = StdRng::seed_from_u64(1);
/// let start = Board::initial(4, &mut rng);
/// let mut policy = Expectimax::with_config(ExpectimaxConfig { depth: 1, ..Default::default() });
/// let record = play(&mut policy, start, &mut rng, GameLimits { steps: Some(5), stop_tile: None }, |_, _| {});
/// assert_eq!(record.moves, 5);
/// ```
pub fn play<P, R, F>(policy: &mut P, start: Board, rng: &mut R, limits: GameLimits, mut on_move: F) -> GameRecord
where
    P: Policy + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&Board, Move),
{
    let mut board = start;
    let mut moves = 0u64;
    let mut total_nodes = 0u64;
    let mut peak_nodes = 0u64;
    let mut game_over = false;
    loop {
        if limits.steps.is_some_and(|limit| moves >= limit) {
            break;
        }
        if limits.stop_tile.is_some_and(|target| board.highest_tile() >= target) {
            break;
        }
        let Some(dir) = policy.best_move(&board) else {
            game_over = true;
            break;
        };
        let stats = policy.last_stats();
        total_nodes = total_nodes.saturating_add(stats.nodes);
        peak_nodes = peak_nodes.max(stats.nodes);
        board = board.make_move(dir, rng);
        moves += 1;
        on_move(&board, dir);
    }
    GameRecord {
        moves,
        score: board.score(),
        highest_tile: board.highest_tile(),
        final_board: board,
        game_over,
        total_nodes,
        peak_nodes,
    }
}
