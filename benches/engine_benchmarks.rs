//! Benchmarks for chess engine performance.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chessmind::board::Position;
use chessmind::engine::{LazySmpEngine, SearchEngine, SearchOptions};
use chessmind::eval::{self, EvalWeights};
use chessmind::perft::perft;
use chessmind::search::SearchLimits;
use chessmind::tt::TranspositionTable;

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");

    let mut board = Position::startpos();
    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| perft(&mut board, black_box(depth)))
        });
    }

    let mut kiwipete =
        Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -");
    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| perft(&mut kiwipete, black_box(depth)))
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let startpos = Position::startpos();
    group.bench_function("startpos", |b| {
        b.iter(|| black_box(startpos.legal_moves()))
    });

    let middlegame =
        Position::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq -");
    group.bench_function("middlegame", |b| {
        b.iter(|| black_box(middlegame.legal_moves()))
    });

    let kiwipete =
        Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -");
    group.bench_function("kiwipete", |b| {
        b.iter(|| black_box(kiwipete.legal_moves()))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for depth in [3, 4, 5] {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| {
                let engine = LazySmpEngine::new(Arc::new(TranspositionTable::new(16)));
                let position = Position::startpos();
                engine.search(
                    &position,
                    &[position.hash()],
                    SearchOptions {
                        threads: 1,
                        limits: SearchLimits::depth_only(depth),
                        use_tt: true,
                        on_iteration: None,
                    },
                )
            })
        });
    }

    for depth in [3, 4] {
        group.bench_with_input(BenchmarkId::new("tactical", depth), &depth, |b, &depth| {
            b.iter(|| {
                let engine = LazySmpEngine::new(Arc::new(TranspositionTable::new(16)));
                let position = Position::from_fen(
                    "r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq -",
                );
                engine.search(
                    &position,
                    &[position.hash()],
                    SearchOptions {
                        threads: 1,
                        limits: SearchLimits::depth_only(depth),
                        use_tt: true,
                        on_iteration: None,
                    },
                )
            })
        });
    }

    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");
    let weights = EvalWeights::default();

    let positions = [
        (
            "startpos",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
        ),
        (
            "middlegame",
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq -",
        ),
        ("endgame", "8/5k2/8/8/8/8/5K2/4R3 w - -"),
    ];

    for (name, fen) in positions {
        let position = Position::from_fen(fen);
        group.bench_with_input(BenchmarkId::new("position", name), &position, |b, position| {
            b.iter(|| black_box(eval::evaluate(position, &weights)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_perft,
    bench_movegen,
    bench_search,
    bench_eval
);
criterion_main!(benches);
