use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use expectimax_2048::engine::{Board, Score, Tile};
use expectimax_2048::expectimax::{Expectimax, ExpectimaxConfig, HeuristicConfig};
use expectimax_2048::game::{self, GameLimits, GameRecord};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

#[derive(Debug, Parser)]
#[command(name = "parallel", about = "Play many 2048 games in parallel and summarize results")]
struct Args {
    /// Number of games to play
    #[arg(long, default_value_t = 8)]
    games: u64,

    /// Board side length
    #[arg(long, default_value_t = 4)]
    size: usize,

    /// Search depth below each post-move board
    #[arg(long, default_value_t = 3)]
    depth: u32,

    /// Base seed; game i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Per-game: stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Per-game: stop once highest tile >= this value
    #[arg(long)]
    stop_tile: Option<Tile>,

    /// TOML file overriding heuristic weights / preferred corner
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Worker threads (defaults to rayon's choice)
    #[arg(long)]
    threads: Option<usize>,

    /// Suppress the progress bar
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    anyhow::ensure!(args.size >= 2, "board size must be at least 2, got {}", args.size);

    let heuristic = match &args.weights {
        Some(path) => HeuristicConfig::from_toml_path(path)
            .with_context(|| format!("loading heuristic config from {}", path.display()))?,
        None => HeuristicConfig::default(),
    };
    let cfg = ExpectimaxConfig { depth: args.depth, heuristic, ..Default::default() };
    let limits = GameLimits { steps: args.steps, stop_tile: args.stop_tile };

    let mut pool = ThreadPoolBuilder::new();
    if let Some(n) = args.threads {
        pool = pool.num_threads(n);
    }
    let pool = pool.build().context("building rayon thread pool")?;

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(args.games);
        pb.set_style(ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:30}] {pos}/{len} games | {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let started = Instant::now();
    let records: Vec<GameRecord> = pool.install(|| {
        (0..args.games)
            .into_par_iter()
            .map(|i| {
                let seed = args.seed.wrapping_add(i);
                let mut rng = StdRng::seed_from_u64(seed);
                let mut policy = Expectimax::with_config(cfg.clone());
                let start = Board::initial(args.size, &mut rng);
                let record = game::play(&mut policy, start, &mut rng, limits, |_, _| {});
                debug!("game {} (seed {}): {} moves, score {}, highest {}", i, seed, record.moves, record.score, record.highest_tile);
                pb.inc(1);
                pb.set_message(format!("last score: {}", record.score));
                record
            })
            .collect()
    });
    pb.finish_and_clear();

    let summary = Summary::of(&records);
    let elapsed = started.elapsed().as_secs_f64().max(1e-6);
    info!(
        "{} games, {} moves in {:.1}s ({:.1} moves/sec)",
        records.len(),
        summary.total_moves,
        elapsed,
        summary.total_moves as f64 / elapsed
    );
    info!("score: mean {:.1}, min {}, max {}", summary.mean_score, summary.min_score, summary.max_score);
    for (tile, count) in summary.highest_tiles.iter().rev() {
        info!("  reached {:>6}: {} game(s)", tile, count);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Summary {
    total_moves: u64,
    mean_score: f64,
    min_score: Score,
    max_score: Score,
    highest_tiles: BTreeMap<Tile, u64>,
}

impl Summary {
    fn of(records: &[GameRecord]) -> Self {
        if records.is_empty() {
            return Summary::default();
        }
        let mut highest_tiles = BTreeMap::new();
        for r in records {
            *highest_tiles.entry(r.highest_tile).or_insert(0) += 1;
        }
        let total_score: Score = records.iter().map(|r| r.score).sum();
        Summary {
            total_moves: records.iter().map(|r| r.moves).sum(),
            mean_score: total_score as f64 / records.len() as f64,
            min_score: records.iter().map(|r| r.score).min().unwrap_or(0),
            max_score: records.iter().map(|r| r.score).max().unwrap_or(0),
            highest_tiles,
        }
    }
}
