use criterion::{criterion_group, criterion_main, Criterion};
use expectimax_2048::engine::{Board, Move};
use expectimax_2048::expectimax::heuristic::{self, Corner, Features, HeuristicConfig};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut boards = vec![Board::new(4)];
    let mut b = Board::initial(4, &mut rng);
    boards.push(b.clone());
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..24 {
        let dir = seq[i % seq.len()];
        let nb = b.shift(dir);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b.clone());
    }
    boards
}

fn bench_heuristic(c: &mut Criterion) {
    let boards = corpus();
    let cfg = HeuristicConfig::default();
    c.bench_function("heuristic/value", |bch| {
        bch.iter(|| {
            let mut acc = 0f64;
            for bd in &boards {
                acc = acc.mul_add(1.000_000_1, cfg.evaluate(bd));
            }
            black_box(acc)
        })
    });

    c.bench_function("heuristic/closeness", |bch| {
        bch.iter(|| boards.iter().map(heuristic::calc_closeness).sum::<f64>())
    });

    c.bench_function("heuristic/features", |bch| {
        bch.iter(|| {
            for bd in &boards {
                black_box(Features::of(bd, Corner::BottomRight));
            }
        })
    });
}

criterion_group!(benches, bench_heuristic);
criterion_main!(benches);
