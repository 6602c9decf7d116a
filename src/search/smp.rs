//! Lazy SMP: independent worker threads searching the same root position,
//! sharing only the transposition table and the stop/node atomics. No
//! barrier coordination.

use super::{
    iterative_deepening, SearchInfo, SearchLimits, SearchParams, SearchState, SharedSearchState,
};
use crate::board::Position;
use crate::eval::EvalWeights;
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;
use crate::types::Move;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

pub struct WorkerResult {
    pub worker_id: usize,
    pub info: SearchInfo,
}

/// Builder for a Lazy-SMP search: thread count, depth cap, and an optional
/// per-iteration progress callback invoked only for the main worker
/// (worker 0).
pub struct SmpConfig {
    threads: usize,
    limits: SearchLimits,
    use_tt: bool,
    on_main_iteration: Option<Box<dyn Fn(&SearchInfo) + Send + Sync>>,
}

impl SmpConfig {
    pub fn new(limits: SearchLimits) -> SmpConfig {
        SmpConfig {
            threads: 1,
            limits,
            use_tt: true,
            on_main_iteration: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> SmpConfig {
        self.threads = threads.max(1);
        self
    }

    pub fn with_use_tt(mut self, use_tt: bool) -> SmpConfig {
        self.use_tt = use_tt;
        self
    }

    pub fn with_callback(mut self, cb: impl Fn(&SearchInfo) + Send + Sync + 'static) -> SmpConfig {
        self.on_main_iteration = Some(Box::new(cb));
        self
    }
}

/// Ancillary workers search to `maxDepth + 4`, per design: only the main
/// worker's progress is authoritative, but deeper ancillary searches feed
/// the shared TT with entries the main worker can reuse.
fn worker_depth_cap(worker_id: usize, main_depth: u32) -> u32 {
    if worker_id == 0 {
        main_depth
    } else {
        main_depth + 4
    }
}

pub fn smp_search(
    position: &Position,
    repetition_history: &[u64],
    tt: Arc<TranspositionTable>,
    eval_weights: EvalWeights,
    params: SearchParams,
    stop: StopFlag,
    config: SmpConfig,
) -> SearchInfo {
    let shared = Arc::new(SharedSearchState {
        tt,
        stop,
        nodes: crate::sync::NodeCounter::new(),
        use_tt: Arc::new(AtomicBool::new(config.use_tt)),
        eval_weights,
        params,
    });

    let threads = config.threads;
    let main_depth = config.limits.max_depth;
    let deadline = config.limits.deadline;
    let max_nodes = config.limits.max_nodes;
    let callback = Arc::new(config.on_main_iteration);

    let results: Vec<WorkerResult> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads);
        for worker_id in 0..threads {
            let shared = Arc::clone(&shared);
            let position = position.clone();
            let repetition_history = repetition_history.to_vec();
            let callback = Arc::clone(&callback);
            let limits = SearchLimits {
                max_depth: worker_depth_cap(worker_id, main_depth),
                deadline,
                max_nodes,
            };
            let builder = thread::Builder::new()
                .name(format!("search-worker-{worker_id}"))
                .stack_size(WORKER_STACK_SIZE);
            let handle = builder
                .spawn_scoped(scope, move || {
                    let mut state = SearchState::new(position, repetition_history);
                    let info = iterative_deepening(&mut state, &shared, &limits, |info| {
                        if worker_id == 0 {
                            if let Some(cb) = callback.as_ref() {
                                cb(info);
                            }
                        }
                    });
                    WorkerResult { worker_id, info }
                })
                .expect("failed to spawn search worker thread");
            handles.push(handle);
        }
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    results
        .into_iter()
        .find(|r| r.worker_id == 0)
        .map(|r| r.info)
        .unwrap_or_default()
}

/// Extracts a ponder move by probing the TT one move past the best move,
/// without committing to a pondering search of our own (out of scope).
pub fn ponder_move_after(position: &Position, tt: &TranspositionTable, best: Move) -> Option<Move> {
    let mut scratch = position.clone();
    scratch.make_move(best);
    tt.probe(scratch.hash()).and_then(|e| e.best_move)
}

