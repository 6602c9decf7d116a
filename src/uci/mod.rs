//! The UCI command loop: a line-oriented request/response protocol over
//! stdin/stdout. This module is deliberately thin — it owns session state
//! (the position, the TT, tunable options) and delegates everything else
//! to [`crate::engine`].

pub mod options;

use crate::board::Position;
use crate::engine::{LazySmpEngine, SearchEngine, SearchOptions};
use crate::eval::EvalWeights;
use crate::search::{SearchInfo, SearchLimits};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;
use crate::types::{Move, Piece, Square};
use options::{apply_setoption, parse_setoption, print_options, UciOptionAction, UciOptions};
use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const ENGINE_NAME: &str = "chessmind";
const ENGINE_AUTHOR: &str = "chessmind contributors";

/// Parses one legal move matching `uci` (long algebraic, e.g. `e2e4`,
/// `e7e8q`). Unparsable or illegal tokens return `None`; callers skip them
/// with no side effects, per protocol error handling.
pub fn parse_uci_move(pos: &Position, uci: &str) -> Option<Move> {
    if uci.len() < 4 {
        return None;
    }
    let from = Square::from_str_coord(&uci[0..2])?;
    let to = Square::from_str_coord(&uci[2..4])?;
    let promotion = uci.chars().nth(4).and_then(Piece::from_uci_char);

    pos.legal_moves().into_iter().find(|m| {
        m.from == from && m.to == to && m.promotion == promotion
    })
}

struct Session {
    options: UciOptions,
    tt: Arc<TranspositionTable>,
    eval_weights: EvalWeights,
    position: Position,
    repetition_history: Vec<u64>,
    stop: StopFlag,
    search_thread: Option<JoinHandle<()>>,
    best_move: Arc<Mutex<Option<Move>>>,
    searching: Arc<AtomicBool>,
}

impl Session {
    fn new() -> Session {
        let options = UciOptions::default();
        Session {
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
            eval_weights: EvalWeights::default(),
            position: Position::startpos(),
            repetition_history: Vec::new(),
            stop: StopFlag::new(),
            search_thread: None,
            best_move: Arc::new(Mutex::new(None)),
            searching: Arc::new(AtomicBool::new(false)),
            options,
        }
    }

    fn handle_uci(&self) {
        println!("id name {ENGINE_NAME}");
        println!("id author {ENGINE_AUTHOR}");
        print_options();
        println!("uciok");
        io::stdout().flush().ok();
    }

    fn handle_ucinewgame(&mut self) {
        self.join_search();
        self.tt.clear();
        self.position = Position::startpos();
        self.repetition_history.clear();
    }

    fn handle_setoption(&mut self, rest: &str) {
        let Some((name, value)) = parse_setoption(rest) else {
            return;
        };
        match apply_setoption(&mut self.options, &name, value.as_deref()) {
            Some(UciOptionAction::ReinitHash(mb)) => match TranspositionTable::try_new(mb) {
                Some(tt) => self.tt = Arc::new(tt),
                None => {
                    println!("info string failed to allocate {mb} MiB hash, keeping previous table");
                    io::stdout().flush().ok();
                    #[cfg(feature = "logging")]
                    log::warn!("TT resize to {mb} MiB failed, keeping previous table");
                }
            },
            Some(UciOptionAction::SetThreads(_)) | None => {}
        }
    }

    fn handle_position(&mut self, rest: &str) {
        let mut tokens = rest.split_whitespace().peekable();
        let mut position = match tokens.peek() {
            Some(&"startpos") => {
                tokens.next();
                Position::startpos()
            }
            Some(&"fen") => {
                tokens.next();
                let fen_tokens: Vec<&str> = tokens.by_ref().take_while(|&t| t != "moves").collect();
                Position::from_fen(&fen_tokens.join(" "))
            }
            _ => Position::startpos(),
        };

        let mut history = vec![position.hash()];
        if rest.contains("moves") {
            let moves_idx = rest.find("moves").unwrap() + "moves".len();
            for tok in rest[moves_idx..].split_whitespace() {
                match parse_uci_move(&position, tok) {
                    Some(m) => {
                        position.make_move(m);
                        history.push(position.hash());
                    }
                    None => continue,
                }
            }
        }

        self.position = position;
        self.repetition_history = history;
    }

    fn join_search(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.search_thread.take() {
            handle.join().ok();
        }
    }

    fn handle_go(&mut self, rest: &str) {
        self.join_search();
        self.stop.reset();

        let limits = self.compute_limits(rest);
        let position = self.position.clone();
        let repetition_history = self.repetition_history.clone();
        let tt = Arc::clone(&self.tt);
        let eval_weights = self.eval_weights;
        let params = self.options.search_params;
        let stop = self.stop.clone();
        let threads = self.options.threads;
        let use_tt = self.options.use_tt;
        let best_move_sink = Arc::clone(&self.best_move);
        let searching = Arc::clone(&self.searching);

        *best_move_sink.lock() = None;
        searching.store(true, Ordering::Relaxed);

        let handle = std::thread::spawn(move || {
            let engine = LazySmpEngine {
                tt,
                eval_weights,
                params,
                stop,
            };
            let options = SearchOptions {
                threads,
                limits,
                use_tt,
                on_iteration: Some(Box::new(|info: &SearchInfo| print_info(info))),
            };
            match engine.search(&position, &repetition_history, options) {
                Ok(result) => {
                    *best_move_sink.lock() = result.best_move;
                    print_bestmove(result.best_move, result.ponder_move);
                }
                Err(_) => {
                    println!("bestmove 0000");
                }
            }
            searching.store(false, Ordering::Relaxed);
            io::stdout().flush().ok();
        });
        self.search_thread = Some(handle);
    }

    fn compute_limits(&self, rest: &str) -> SearchLimits {
        let mut depth: Option<u32> = None;
        let mut movetime: Option<u64> = None;
        let mut wtime: Option<u64> = None;
        let mut btime: Option<u64> = None;
        let mut winc: Option<u64> = None;
        let mut binc: Option<u64> = None;
        let mut infinite = false;

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                "depth" => {
                    depth = tokens.get(i + 1).and_then(|v| v.parse().ok());
                    i += 2;
                }
                "movetime" => {
                    movetime = tokens.get(i + 1).and_then(|v| v.parse().ok());
                    i += 2;
                }
                "wtime" => {
                    wtime = tokens.get(i + 1).and_then(|v| v.parse().ok());
                    i += 2;
                }
                "btime" => {
                    btime = tokens.get(i + 1).and_then(|v| v.parse().ok());
                    i += 2;
                }
                "winc" => {
                    winc = tokens.get(i + 1).and_then(|v| v.parse().ok());
                    i += 2;
                }
                "binc" => {
                    binc = tokens.get(i + 1).and_then(|v| v.parse().ok());
                    i += 2;
                }
                "infinite" => {
                    infinite = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        const HARD_FLOOR_MS: u64 = 10;
        let max_depth = depth.unwrap_or(64);

        if let Some(ms) = movetime {
            return SearchLimits::with_time(max_depth, Duration::from_millis(ms.max(HARD_FLOOR_MS)));
        }
        if depth.is_some() || infinite {
            return SearchLimits::depth_only(max_depth);
        }

        let (my_time, my_inc) = match self.position.side_to_move() {
            crate::types::Color::White => (wtime, winc.unwrap_or(0)),
            crate::types::Color::Black => (btime, binc.unwrap_or(0)),
        };
        if let Some(t) = my_time {
            let overhead = self.options.move_overhead_ms;
            let budget = t.saturating_sub(overhead).min(t / 20 + my_inc / 2);
            SearchLimits::with_time(max_depth, Duration::from_millis(budget.max(HARD_FLOOR_MS)))
        } else {
            SearchLimits::depth_only(max_depth)
        }
    }

    fn handle_stop(&mut self) {
        self.join_search();
    }

    fn handle_perft(&mut self, rest: &str) {
        let depth: u32 = rest.trim().parse().unwrap_or(1);
        let mut pos = self.position.clone();
        let divide = crate::perft::perft_divide(&mut pos, depth);
        let mut total = 0u64;
        for (m, count) in &divide {
            println!("{} {}", m.to_uci(), count);
            total += count;
        }
        println!("Nodes searched: {total}");
    }

    fn handle_bench(&mut self) {
        const CORPUS: &[&str] = &[
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq -",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ -",
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - -",
        ];
        let mut total_nodes = 0u64;
        let start = std::time::Instant::now();
        for fen in CORPUS {
            let position = Position::from_fen(fen);
            let engine = LazySmpEngine::new(Arc::clone(&self.tt));
            let options = SearchOptions {
                threads: 1,
                limits: SearchLimits::depth_only(6),
                use_tt: true,
                on_iteration: None,
            };
            if let Ok(result) = engine.search(&position, &[position.hash()], options) {
                total_nodes += result.info.nodes;
            }
        }
        let elapsed = start.elapsed().as_secs_f64().max(1e-6);
        println!("nodes {total_nodes}");
        println!("nps {}", (total_nodes as f64 / elapsed) as u64);
    }
}

fn print_info(info: &SearchInfo) {
    let pv: String = info
        .pv
        .iter()
        .map(|m| m.to_uci())
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "info depth {} seldepth {} score cp {} nodes {} nps {} time {} pv {}",
        info.depth,
        info.seldepth,
        info.score_cp,
        info.nodes,
        info.nps,
        info.elapsed.as_millis(),
        pv
    );
    io::stdout().flush().ok();
}

fn print_bestmove(best: Option<Move>, ponder: Option<Move>) {
    match best {
        Some(m) => match ponder {
            Some(p) => println!("bestmove {} ponder {}", m.to_uci(), p.to_uci()),
            None => println!("bestmove {}", m.to_uci()),
        },
        None => println!("bestmove 0000"),
    }
}

/// Reads commands from stdin until `quit` or EOF. Unknown commands are
/// ignored; this never panics on malformed input.
pub fn run() {
    let mut session = Session::new();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r),
            None => (line, ""),
        };

        match command {
            "uci" => session.handle_uci(),
            "isready" => {
                println!("readyok");
                io::stdout().flush().ok();
            }
            "ucinewgame" => session.handle_ucinewgame(),
            "setoption" => session.handle_setoption(rest),
            "position" => session.handle_position(rest),
            "go" => session.handle_go(rest),
            "stop" => session.handle_stop(),
            "ponderhit" => {}
            "perft" => session.handle_perft(rest),
            "bench" => session.handle_bench(),
            "quit" => {
                session.join_search();
                break;
            }
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_quiet_move() {
        let pos = Position::startpos();
        let m = parse_uci_move(&pos, "e2e4").expect("legal");
        assert_eq!(m.to_uci(), "e2e4");
    }

    #[test]
    fn rejects_illegal_move_token() {
        let pos = Position::startpos();
        assert!(parse_uci_move(&pos, "e2e5").is_none());
    }

    #[test]
    fn setoption_parses_and_resizes_hash() {
        let mut session = Session::new();
        session.handle_setoption("name Hash value 4");
        assert_eq!(session.options.hash_mb, 4);
    }
}
