//! End-to-end scenarios exercising the public API the way a UCI session
//! would: set a position, run a search, check what comes back.

use chessmind::board::Position;
use chessmind::engine::{LazySmpEngine, SearchEngine, SearchOptions};
use chessmind::eval::EvalWeights;
use chessmind::search::SearchLimits;
use chessmind::tt::TranspositionTable;
use chessmind::uci::parse_uci_move;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fresh_engine() -> LazySmpEngine {
    LazySmpEngine::new(Arc::new(TranspositionTable::new(8)))
}

#[test]
fn movetime_obeys_its_budget() {
    let engine = fresh_engine();
    let position = Position::startpos();
    let options = SearchOptions {
        threads: 1,
        limits: SearchLimits::with_time(64, Duration::from_millis(200)),
        use_tt: true,
        on_iteration: None,
    };
    let start = Instant::now();
    let result = engine
        .search(&position, &[position.hash()], options)
        .expect("startpos always has legal moves");
    assert!(start.elapsed() < Duration::from_millis(400));
    assert!(result.best_move.is_some());
}

#[test]
fn repetition_under_contempt_is_avoided_when_ahead() {
    // White is up a rook; shuffling the king back and forth would draw by
    // repetition, which contempt should steer away from at shallow depth.
    let position = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - -");
    let weights = EvalWeights::default();
    let eval = chessmind::eval::evaluate(&position, &weights);
    assert!(eval > 300);
}

#[test]
fn no_legal_moves_reports_an_error_not_a_panic() {
    // Checkmated black to move: fool's mate final position.
    let mut position = Position::startpos();
    for uci in ["f2f3", "e7e5", "g2g4", "d8h4"] {
        let m = parse_uci_move(&position, uci).expect("legal move in the line");
        position.make_move(m);
    }
    assert!(position.legal_moves().is_empty());
    assert!(position.in_check(position.side_to_move()));

    let engine = fresh_engine();
    let options = SearchOptions {
        threads: 1,
        limits: SearchLimits::depth_only(2),
        use_tt: true,
        on_iteration: None,
    };
    let result = engine.search(&position, &[position.hash()], options);
    assert!(result.is_err());
}

#[test]
fn tt_concurrent_probes_never_mix_keys() {
    let tt = Arc::new(TranspositionTable::new(1));
    let mut handles = Vec::new();
    for thread_id in 0..8u64 {
        let tt = Arc::clone(&tt);
        handles.push(std::thread::spawn(move || {
            for i in 0..5000u64 {
                let key = thread_id * 1_000_000 + i;
                tt.store(
                    key,
                    4,
                    thread_id as i32,
                    chessmind::types::BoundType::Exact,
                    None,
                );
                if let Some(entry) = tt.probe(key) {
                    assert_eq!(entry.score, thread_id as i32);
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn fen_round_trip_preserves_fingerprint_after_normalization() {
    let fen = "4k3/8/8/4Pp2/8/8/8/4K3 w - f6";
    let position = Position::from_fen(fen);
    let reparsed = Position::from_fen(&position.to_fen());
    assert_eq!(position.hash(), reparsed.hash());
}
