//! Iterative-deepening negamax with alpha-beta, quiescence, and the usual
//! battery of pruning and ordering heuristics. One [`SearchState`] per
//! worker thread; workers share only the transposition table and the
//! atomics in [`SharedSearchState`].

pub mod smp;

use crate::board::Position;
use crate::constants::{DRAW_SCORE, INFINITY, MATE_SCORE, MATE_THRESHOLD, MAX_PLY};
use crate::eval::{self, EvalWeights};
use crate::ordering::{self, OrderingState};
use crate::sync::{NodeCounter, StopFlag};
use crate::tt::TranspositionTable;
use crate::types::{BoundType, Move};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunable search knobs, settable at runtime via `setoption`.
#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    pub null_move_min_depth: i32,
    pub null_move_base_reduction: i32,
    pub futility_max_depth: i32,
    pub futility_margin_base: i32,
    pub futility_margin_per_depth: i32,
    pub razor_max_depth: i32,
    pub razor_margin: i32,
    pub lmr_min_depth: i32,
    pub lmr_min_legal: i32,
    pub aspiration_min_depth: i32,
    pub aspiration_delta: i32,
}

impl Default for SearchParams {
    fn default() -> SearchParams {
        SearchParams {
            null_move_min_depth: 3,
            null_move_base_reduction: 2,
            futility_max_depth: 6,
            futility_margin_base: 50,
            futility_margin_per_depth: 50,
            razor_max_depth: 3,
            razor_margin: 300,
            lmr_min_depth: 3,
            lmr_min_legal: 4,
            aspiration_min_depth: 5,
            aspiration_delta: 25,
        }
    }
}

/// State shared by every Lazy-SMP worker: the TT, the stop flag, and the
/// global node counter. Everything else (killers, history, local PV,
/// local repetition stack) is thread-local, living on [`SearchState`].
pub struct SharedSearchState {
    pub tt: Arc<TranspositionTable>,
    pub stop: StopFlag,
    pub nodes: NodeCounter,
    pub use_tt: Arc<AtomicBool>,
    pub eval_weights: EvalWeights,
    pub params: SearchParams,
}

impl SharedSearchState {
    pub fn new(tt: Arc<TranspositionTable>, eval_weights: EvalWeights, params: SearchParams) -> SharedSearchState {
        SharedSearchState {
            tt,
            stop: StopFlag::new(),
            nodes: NodeCounter::new(),
            use_tt: Arc::new(AtomicBool::new(true)),
            eval_weights,
            params,
        }
    }

    #[inline]
    fn tt_enabled(&self) -> bool {
        self.use_tt.load(AtomicOrdering::Relaxed)
    }
}

pub struct SearchLimits {
    pub max_depth: u32,
    pub deadline: Option<Instant>,
    pub max_nodes: Option<u64>,
}

impl SearchLimits {
    pub fn depth_only(depth: u32) -> SearchLimits {
        SearchLimits {
            max_depth: depth,
            deadline: None,
            max_nodes: None,
        }
    }

    pub fn with_time(depth: u32, movetime: Duration) -> SearchLimits {
        SearchLimits {
            max_depth: depth,
            deadline: Some(Instant::now() + movetime),
            max_nodes: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub score_cp: i32,
    pub nodes: u64,
    pub nps: u64,
    pub elapsed: Duration,
    pub pv: Vec<Move>,
}

/// Per-thread mutable search context: the local position copy, ordering
/// heuristics, repetition stack, and node budget bookkeeping.
pub struct SearchState {
    pub position: Position,
    ordering: OrderingState,
    repetition_history: Vec<u64>,
    local_nodes: u64,
    seldepth: usize,
    started_at: Instant,
}

const NODE_POLL_INTERVAL: u64 = 2048;

impl SearchState {
    pub fn new(position: Position, repetition_history: Vec<u64>) -> SearchState {
        SearchState {
            position,
            ordering: OrderingState::new(),
            repetition_history,
            local_nodes: 0,
            seldepth: 0,
            started_at: Instant::now(),
        }
    }

    fn is_repetition(&self) -> bool {
        let key = self.position.hash();
        self.repetition_history.iter().filter(|&&h| h == key).count() >= 1
    }

    fn should_stop(&self, shared: &SharedSearchState, limits: &SearchLimits) -> bool {
        if shared.stop.is_stopped() {
            return true;
        }
        if let Some(deadline) = limits.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        if let Some(max_nodes) = limits.max_nodes {
            if shared.nodes.get() >= max_nodes {
                return true;
            }
        }
        false
    }
}

/// A sentinel returned by negamax when the node was abandoned because the
/// search was asked to stop; the driver must not treat it as a real score.
const STOP_SENTINEL: i32 = i32::MIN + 1;

fn is_stop_sentinel(score: i32) -> bool {
    score == STOP_SENTINEL
}

pub fn negamax(
    state: &mut SearchState,
    shared: &SharedSearchState,
    limits: &SearchLimits,
    mut depth: i32,
    mut alpha: i32,
    beta: i32,
    ply: usize,
    prev_move: Option<Move>,
) -> i32 {
    state.local_nodes += 1;
    shared.nodes.add(1);
    state.seldepth = state.seldepth.max(ply);

    if state.local_nodes % NODE_POLL_INTERVAL == 0 && state.should_stop(shared, limits) {
        return STOP_SENTINEL;
    }

    if ply > 0 && state.is_repetition() {
        return eval::repetition_contempt(&state.position, &shared.eval_weights);
    }
    if state.position.is_insufficient_material() {
        return DRAW_SCORE;
    }

    let in_check = state.position.in_check(state.position.side_to_move());
    if in_check {
        depth += 1;
    }

    if depth <= 0 {
        return quiescence(state, shared, limits, alpha, beta, ply);
    }

    let key = state.position.hash();
    let mut tt_move: Option<Move> = None;
    if shared.tt_enabled() {
        if let Some(entry) = shared.tt.probe(key) {
            tt_move = entry.best_move;
            if entry.depth as i32 >= depth && ply > 0 {
                if let Some(score) =
                    crate::board::bound_flag_allows_cutoff(entry.bound, entry.score, alpha, beta)
                {
                    return score;
                }
            }
        }
    }

    let static_eval = eval::evaluate(&state.position, &shared.eval_weights);

    if depth <= shared.params.razor_max_depth
        && !in_check
        && ply > 0
        && static_eval + shared.params.razor_margin < alpha
    {
        let score = quiescence(state, shared, limits, alpha, beta, ply);
        if is_stop_sentinel(score) {
            return score;
        }
        if score < alpha {
            return score;
        }
    }

    if depth >= shared.params.null_move_min_depth
        && !in_check
        && ply > 0
        && static_eval >= beta
        && !state.position.side_to_move_has_only_pawns()
    {
        let r = shared.params.null_move_base_reduction
            + depth / 4
            + ((static_eval - beta) / 200).min(3);
        let null_info = state.position.make_null();
        let score = -negamax(
            state,
            shared,
            limits,
            depth - 1 - r,
            -beta,
            -beta + 1,
            ply + 1,
            None,
        );
        state.position.unmake_null(null_info);
        if is_stop_sentinel(score) {
            return score;
        }
        if score >= beta {
            return beta;
        }
    }

    let mut moves = state.position.legal_moves();
    if moves.is_empty() {
        return if in_check {
            -(MATE_SCORE - ply as i32)
        } else {
            DRAW_SCORE
        };
    }

    ordering::order_moves(
        &state.position,
        &mut moves,
        tt_move,
        ply,
        prev_move,
        &state.ordering,
    );

    let original_alpha = alpha;
    let mut best_score = -INFINITY;
    let mut best_move = moves[0];
    let mut legal = 0i32;

    for m in moves {
        legal += 1;

        if depth <= shared.params.futility_max_depth
            && !in_check
            && legal > 1
            && m.is_quiet()
            && static_eval
                + shared.params.futility_margin_base
                + shared.params.futility_margin_per_depth * depth
                < alpha
        {
            continue;
        }

        let undo = state.position.make_move(m);
        state.repetition_history.push(state.position.hash());

        let gives_check = state.position.in_check(state.position.side_to_move());
        let mut reduction = 0;
        if m.is_quiet()
            && !in_check
            && !gives_check
            && legal >= shared.params.lmr_min_legal
            && depth >= shared.params.lmr_min_depth
        {
            let lmr = 1.0 + ((depth as f64).ln() * (legal as f64).ln() / 2.0);
            reduction = (lmr.round() as i32).clamp(0, depth - 1);
        }

        let score = if legal == 1 {
            -negamax(
                state,
                shared,
                limits,
                depth - 1,
                -beta,
                -alpha,
                ply + 1,
                Some(m),
            )
        } else {
            let reduced = -negamax(
                state,
                shared,
                limits,
                depth - 1 - reduction,
                -alpha - 1,
                -alpha,
                ply + 1,
                Some(m),
            );
            if is_stop_sentinel(reduced) {
                reduced
            } else if reduced > alpha && (reduction > 0 || reduced < beta) {
                let full = -negamax(
                    state,
                    shared,
                    limits,
                    depth - 1,
                    -beta,
                    -alpha,
                    ply + 1,
                    Some(m),
                );
                full
            } else {
                reduced
            }
        };

        state.repetition_history.pop();
        state.position.unmake_move(m, undo);

        if is_stop_sentinel(score) {
            return score;
        }

        if score > best_score {
            best_score = score;
            best_move = m;
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            if m.is_quiet() {
                state.ordering.record_killer(ply, m);
                state.ordering.record_history(m, depth);
                state.ordering.record_counter(prev_move, m);
            }
            break;
        }
    }

    if shared.tt_enabled() {
        let bound = if best_score <= original_alpha {
            BoundType::Upper
        } else if best_score >= beta {
            BoundType::Lower
        } else {
            BoundType::Exact
        };
        shared
            .tt
            .store(key, depth.max(0) as u8, best_score, bound, Some(best_move));
    }

    best_score
}

fn quiescence(
    state: &mut SearchState,
    shared: &SharedSearchState,
    limits: &SearchLimits,
    mut alpha: i32,
    beta: i32,
    ply: usize,
) -> i32 {
    state.local_nodes += 1;
    shared.nodes.add(1);
    state.seldepth = state.seldepth.max(ply);

    if state.local_nodes % NODE_POLL_INTERVAL == 0 && state.should_stop(shared, limits) {
        return STOP_SENTINEL;
    }

    let stand_pat = eval::evaluate(&state.position, &shared.eval_weights);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    if ply >= MAX_PLY {
        return alpha;
    }

    let mut moves = state.position.capture_moves();
    if moves.is_empty() {
        return alpha;
    }
    ordering::order_moves(&state.position, &mut moves, None, ply, None, &state.ordering);

    for m in moves {
        if crate::board::see::see(&state.position, m) < 0 {
            continue;
        }
        let undo = state.position.make_move(m);
        let score = -quiescence(state, shared, limits, -beta, -alpha, ply + 1);
        state.position.unmake_move(m, undo);

        if is_stop_sentinel(score) {
            return score;
        }
        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

/// Iterative deepening from depth 1 to `limits.max_depth` (or until time
/// runs out). Aspiration windows kick in from depth
/// `params.aspiration_min_depth` onward. Returns the info for the deepest
/// completed iteration; the caller is responsible for emitting progress.
pub fn iterative_deepening(
    state: &mut SearchState,
    shared: &SharedSearchState,
    limits: &SearchLimits,
    mut on_iteration: impl FnMut(&SearchInfo),
) -> SearchInfo {
    state.started_at = Instant::now();
    let mut best = SearchInfo::default();
    let mut prev_score = 0;

    for depth in 1..=limits.max_depth {
        state.seldepth = 0;
        let delta = shared.params.aspiration_delta;
        let (alpha, beta) = if depth >= shared.params.aspiration_min_depth as u32 {
            (prev_score - delta, prev_score + delta)
        } else {
            (-INFINITY, INFINITY)
        };

        let mut score = negamax(state, shared, limits, depth as i32, alpha, beta, 0, None);
        if is_stop_sentinel(score) {
            return best;
        }
        if score <= alpha || score >= beta {
            // Aspiration window missed: re-search with the full window.
            score = negamax(state, shared, limits, depth as i32, -INFINITY, INFINITY, 0, None);
            if is_stop_sentinel(score) {
                return best;
            }
        }

        prev_score = score;
        let pv = build_pv(state, shared, depth as i32);
        let elapsed = state.started_at.elapsed();
        let nodes = shared.nodes.get();
        let nps = if elapsed.as_secs_f64() > 0.0 {
            (nodes as f64 / elapsed.as_secs_f64()) as u64
        } else {
            0
        };
        best = SearchInfo {
            depth,
            seldepth: state.seldepth as u32,
            score_cp: score,
            nodes,
            nps,
            elapsed,
            pv,
        };
        on_iteration(&best);

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
        if state.should_stop(shared, limits) {
            break;
        }
    }

    best
}

fn build_pv(state: &mut SearchState, shared: &SharedSearchState, max_len: i32) -> Vec<Move> {
    let mut pv = Vec::new();
    let mut undo_stack = Vec::new();
    for _ in 0..max_len.max(1) {
        let Some(entry) = shared.tt.probe(state.position.hash()) else {
            break;
        };
        let Some(tt_move) = entry.best_move else {
            break;
        };
        // The packed TT move only carries from/to/promotion; match it back
        // against a real legal move to recover captured/en-passant/castling.
        let Some(mv) = state
            .position
            .legal_moves()
            .into_iter()
            .find(|lm| lm.same_from_to_promotion(&tt_move))
        else {
            break;
        };
        let undo = state.position.make_move(mv);
        undo_stack.push((mv, undo));
        pv.push(mv);
    }
    for (mv, undo) in undo_stack.into_iter().rev() {
        state.position.unmake_move(mv, undo);
    }
    pv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use std::sync::Arc;

    fn fresh_shared() -> SharedSearchState {
        SharedSearchState::new(
            Arc::new(TranspositionTable::new(1)),
            EvalWeights::default(),
            SearchParams::default(),
        )
    }

    #[test]
    fn finds_mate_in_one_fools_mate() {
        let mut pos = Position::startpos();
        for uci in ["f2f3", "e7e5", "g2g4"] {
            let m = crate::uci::parse_uci_move(&pos, uci).expect("legal move");
            pos.make_move(m);
        }
        let shared = fresh_shared();
        let mut state = SearchState::new(pos, Vec::new());
        let limits = SearchLimits::depth_only(2);
        let info = iterative_deepening(&mut state, &shared, &limits, |_| {});
        assert_eq!(info.pv.first().map(|m| m.to_uci()), Some("d8h4".to_string()));
        assert!(info.score_cp > 29_000);
    }

    #[test]
    fn avoids_stalemating_move() {
        let pos = Position::from_fen("7k/8/6Q1/8/8/8/8/7K w - -");
        let shared = fresh_shared();
        let mut state = SearchState::new(pos, Vec::new());
        let limits = SearchLimits::depth_only(4);
        let info = iterative_deepening(&mut state, &shared, &limits, |_| {});
        assert_ne!(info.pv.first().map(|m| m.to_uci()), Some("g6g7".to_string()));
        assert!(info.score_cp > 29_000);
    }
}
