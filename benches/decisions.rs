//! Move generation and AI decision benchmarks.

use std::sync::atomic::AtomicBool;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tab::ai::{Difficulty, MonteCarlo, RolloutConfig};
use tab::core::rng::DeterministicRng;
use tab::game::board::{Board, Cell, Move, Side};
use tab::game::moves::MoveGenerator;

/// An opened middle game: both sides have moved a few pieces off the home row.
fn midgame(width: usize) -> Board {
    let mut board = Board::setup(width);
    let w = width as u8;
    let opening = [
        Move { from: Cell::new(0, 0), to: Cell::new(1, 0) },
        Move { from: Cell::new(3, w - 1), to: Cell::new(2, w - 1) },
        Move { from: Cell::new(1, 0), to: Cell::new(1, 3) },
        Move { from: Cell::new(2, w - 1), to: Cell::new(2, w - 4) },
    ];
    for mv in opening {
        board.apply_move(mv);
    }
    board
}

fn bench_move_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("legal_moves");
    for width in [5usize, 9, 15] {
        let board = midgame(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &board, |b, board| {
            b.iter(|| {
                let generator = MoveGenerator::new(board);
                for steps in [1u8, 2, 3, 4, 6] {
                    black_box(generator.legal_moves(steps, Side::Blue));
                }
            })
        });
    }
    group.finish();
}

fn bench_tiers(c: &mut Criterion) {
    let board = midgame(9);
    let never = AtomicBool::new(false);
    let mut group = c.benchmark_group("pick");
    for tier in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        let strategy = tier.strategy();
        group.bench_function(tier.as_str(), |b| {
            let mut rng = DeterministicRng::new(7);
            b.iter(|| black_box(strategy.pick(&board, Side::Blue, 3, &mut rng, &never)))
        });
    }
    group.finish();
}

fn bench_rollout_budget(c: &mut Criterion) {
    let board = midgame(9);
    let never = AtomicBool::new(false);
    let mut group = c.benchmark_group("rollout_simulations");
    group.sample_size(20);
    for simulations in [35u32, 140, 560] {
        let ai = MonteCarlo::new(RolloutConfig::default().with_simulations(simulations));
        group.bench_with_input(BenchmarkId::from_parameter(simulations), &ai, |b, ai| {
            let mut rng = DeterministicRng::new(11);
            b.iter(|| black_box(ai.decide(&board, Side::Blue, 2, &mut rng, &never)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_move_generation, bench_tiers, bench_rollout_budget);
criterion_main!(benches);
