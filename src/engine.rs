//! The search engine as a capability: a small trait wrapping Lazy-SMP
//! iterative deepening, so the UCI layer doesn't need to know how the
//! search is implemented.

use crate::board::Position;
use crate::eval::EvalWeights;
use crate::search::smp::{smp_search, SmpConfig};
use crate::search::{SearchInfo, SearchLimits, SearchParams};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;
use crate::types::Move;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum SearchError {
    NoLegalMoves,
    Internal(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::NoLegalMoves => write!(f, "position has no legal moves"),
            SearchError::Internal(msg) => write!(f, "internal search error: {msg}"),
        }
    }
}

impl From<String> for SearchError {
    fn from(msg: String) -> SearchError {
        SearchError::Internal(msg)
    }
}

pub struct SearchOptions {
    pub threads: usize,
    pub limits: SearchLimits,
    pub use_tt: bool,
    pub on_iteration: Option<Box<dyn Fn(&SearchInfo) + Send + Sync>>,
}

pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub info: SearchInfo,
}

/// The evaluator and the search are two implementations of the same
/// contract (`evaluate(position) -> centipawns`); picking one is a
/// runtime option, the search itself is agnostic to which is plugged in.
pub trait SearchEngine {
    fn search(
        &self,
        position: &Position,
        repetition_history: &[u64],
        options: SearchOptions,
    ) -> Result<SearchResult, SearchError>;
}

pub struct LazySmpEngine {
    pub tt: Arc<TranspositionTable>,
    pub eval_weights: EvalWeights,
    pub params: SearchParams,
    pub stop: StopFlag,
}

impl LazySmpEngine {
    pub fn new(tt: Arc<TranspositionTable>) -> LazySmpEngine {
        LazySmpEngine {
            tt,
            eval_weights: EvalWeights::default(),
            params: SearchParams::default(),
            stop: StopFlag::new(),
        }
    }
}

impl SearchEngine for LazySmpEngine {
    fn search(
        &self,
        position: &Position,
        repetition_history: &[u64],
        options: SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        if position.legal_moves().is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        self.stop.reset();
        let mut config = SmpConfig::new(options.limits)
            .with_threads(options.threads)
            .with_use_tt(options.use_tt);
        if let Some(cb) = options.on_iteration {
            config = config.with_callback(move |info| cb(info));
        }

        let info = smp_search(
            position,
            repetition_history,
            Arc::clone(&self.tt),
            self.eval_weights,
            self.params,
            self.stop.clone(),
            config,
        );

        let best_move = info.pv.first().copied();
        let ponder_move = best_move.and_then(|m| {
            crate::search::smp::ponder_move_after(position, &self.tt, m)
        });

        Ok(SearchResult {
            best_move,
            ponder_move,
            info,
        })
    }
}
