use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use expectimax_2048::engine::{Board, Tile};
use expectimax_2048::expectimax::{Expectimax, ExpectimaxConfig, ExpectimaxParallel, HeuristicConfig, Policy};
use expectimax_2048::game::{self, GameLimits};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Parser)]
#[command(name = "expectimax-2048", about = "Play one 2048 game with the expectimax agent")]
struct Args {
    /// Board side length
    #[arg(long, default_value_t = 4)]
    size: usize,

    /// Search depth below each post-move board
    #[arg(long, default_value_t = 3)]
    depth: u32,

    /// RNG seed for tile spawns (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Stop once highest tile >= this value
    #[arg(long)]
    stop_tile: Option<Tile>,

    /// Per-move search deadline in milliseconds
    #[arg(long)]
    time_budget_ms: Option<u64>,

    /// TOML file overriding heuristic weights / preferred corner
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Disable the transposition table
    #[arg(long)]
    no_cache: bool,

    /// Use the rayon-parallel searcher
    #[arg(long)]
    parallel: bool,

    /// Print the board after every move
    #[arg(long)]
    show_board: bool,

    /// Suppress the spinner status line
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
    let cfg = ExpectimaxConfig {
        depth: args.depth,
        cache_enabled: !args.no_cache,
        time_budget: args.time_budget_ms.map(Duration::from_millis),
        heuristic,
        ..Default::default()
    };
    let mut policy: Box<dyn Policy> = if args.parallel {
        Box::new(ExpectimaxParallel::with_config(cfg))
    } else {
        Box::new(Expectimax::with_config(cfg))
    };

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("seed {}, {}x{} board, depth {}", seed, args.size, args.size, args.depth);
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Board::initial(args.size, &mut rng);
    if args.show_board {
        println!("{}", render(&start));
    }

    let pb = if args.quiet || args.show_board {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | Moves: {pos} | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    let started = Instant::now();
    let limits = GameLimits { steps: args.steps, stop_tile: args.stop_tile };
    let record = game::play(policy.as_mut(), start, &mut rng, limits, |board, dir| {
        if args.show_board {
            println!("{dir}\n{}", render(board));
        }
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!("score: {} | max tile: {}", board.score(), board.highest_tile()));
        }
    });
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let elapsed = started.elapsed().as_secs_f64().max(1e-6);
    info!(
        "{} after {} moves ({:.1} moves/sec): score {}, highest tile {}",
        if record.game_over { "game over" } else { "stopped" },
        record.moves,
        record.moves as f64 / elapsed,
        record.score,
        record.highest_tile
    );
    info!("states considered: {}, max for a single move: {}", record.total_nodes, record.peak_nodes);
    Ok(())
}

fn render(board: &Board) -> String {
    let n = board.size();
    let divider = "-".repeat(n * 8 - 1);
    let rows: Vec<String> = (0..n)
        .map(|r| board.row(r).iter().map(|&v| format_val(v)).collect::<Vec<_>>().join("|"))
        .collect();
    format!("\n{}\n", rows.join(&format!("\n{divider}\n")))
}

fn format_val(val: Tile) -> String {
    match val {
        0 => " ".repeat(7),
        v => format!("{:^7}", v),
    }
}
