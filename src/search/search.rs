//! Principal-variation negamax search (L9 core): iterative deepening over
//! an aspiration window, feeding a staged `MovePicker` at every node and
//! pruning with reverse futility, razoring, null-move, futility, late-move
//! reduction and extensions. Grounded on the teacher's `alpha_beta`/`search`
//! pair, generalized to the packed `Move`'s ordering score, the rewritten
//! `TranspositionTable`, and the shared `Evaluator` trait.

use crate::board::{Board, Color, Piece};
use crate::eval::Evaluator;
use crate::moves::execute::{make_move, make_null_move, undo_move, undo_null_move};
use crate::moves::movegen::in_check;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::ordering::SCORE_ZERO_SEE_CAPTURE;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{Bound, TranspositionTable, MATE_THRESHOLD};
use crate::utils::see_piece_value;
use std::time::{Duration, Instant};

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const DRAW_SCORE: i32 = 0;
const DRAW_NOISE: i32 = 2;
const NODES_PER_TIME_CHECK: u64 = 5000;

const RFP_DEPTH_LIMIT: i32 = 4;
const RFP_MARGIN_PER_PLY: i32 = 125;

const RAZOR_DEPTH: i32 = 3;
const RAZOR_MARGIN: i32 = 1150;

const FP_DEPTH_LIMIT: i32 = 4;
const FP_MARGIN_BASE: i32 = 150;
const FP_MARGIN_PER_PLY: i32 = 150;

const QS_DELTA_MARGIN: i32 = 90;

/// Mirrors the board's own ring-buffer undo depth; the search never recurses
/// deeper than this many plies from the root.
const MAX_SEARCH_PLY: usize = 128;

pub struct TimeManager {
    start: Instant,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    node_limit: Option<u64>,
    external_stop: Option<std::sync::Arc<std::sync::atomic::AtomicBool>>,
    pub stop: bool,
}

impl TimeManager {
    pub fn new(soft_limit: Option<Duration>, hard_limit: Option<Duration>, node_limit: Option<u64>) -> Self {
        Self { start: Instant::now(), soft_limit, hard_limit, node_limit, external_stop: None, stop: false }
    }

    pub fn unlimited() -> Self {
        Self::new(None, None, None)
    }

    /// Wires in a flag an outside caller (the orchestrator's `stop` command)
    /// can set asynchronously; checked alongside the time/node budget.
    pub fn with_external_stop(mut self, flag: std::sync::Arc<std::sync::atomic::AtomicBool>) -> Self {
        self.external_stop = Some(flag);
        self
    }

    fn check(&mut self, nodes: u64) {
        if self.stop {
            return;
        }
        if let Some(flag) = &self.external_stop {
            if flag.load(std::sync::atomic::Ordering::Relaxed) {
                self.stop = true;
                return;
            }
        }
        if let Some(limit) = self.node_limit {
            if nodes >= limit {
                self.stop = true;
                return;
            }
        }
        if let Some(limit) = self.hard_limit.or(self.soft_limit) {
            if self.start.elapsed() >= limit {
                self.stop = true;
            }
        }
    }

    fn soft_expired(&self) -> bool {
        self.soft_limit.map(|l| self.start.elapsed() >= l).unwrap_or(false)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Allocates a soft/hard budget for one move: `my_time/moves_to_go +
/// increment`, with the hard cap at 4x the soft budget so a sudden tactical
/// spike can't run away with the whole clock.
pub fn allocate_time(my_time: Duration, increment: Duration, moves_to_go: Option<u32>) -> (Duration, Duration) {
    let divisor = moves_to_go.unwrap_or(20).max(1);
    let soft = my_time / divisor + increment;
    let hard = (soft * 4).min(my_time);
    (soft, hard)
}

struct SearchState<'a> {
    board: &'a mut Board,
    evaluator: &'a mut dyn Evaluator,
    ctx: &'a mut SearchContext,
    tt: &'a mut TranspositionTable,
    time: &'a mut TimeManager,
    nodes: u64,
    seldepth: usize,
    null_move_allowed: bool,
}

impl<'a> SearchState<'a> {
    fn make(&mut self, ply: usize, mv: Move) {
        self.evaluator.snapshot(ply);
        let color = self.board.side_to_move;
        make_move(self.board, mv);
        apply_eval_delta(self.board, self.evaluator, color, mv);
    }

    fn undo(&mut self, ply: usize, mv: Move) {
        undo_move(self.board, mv);
        self.evaluator.restore(ply);
    }
}

/// Applies the incremental feature deltas for `mv` to `evaluator`, using
/// `board` as it stands *after* `make_move` has already mutated it — NNUE's
/// king-bucket lookups need the piece at its new position, per the
/// `Evaluator` trait's contract. `color` is the side that made the move,
/// captured separately since `board.side_to_move` has already flipped by
/// the time this runs. Non-king moves don't care which side of the move the
/// king-bucket lookup happens on; king moves are routed through
/// `move_piece`, which special-cases a bucket change by forcing a full
/// rebuild against the post-move king square.
fn apply_eval_delta(board: &Board, evaluator: &mut dyn Evaluator, color: Color, mv: Move) {
    if mv.is_en_passant() {
        let cap_idx = if color == Color::White { mv.to().index() - 8 } else { mv.to().index() + 8 };
        evaluator.remove_piece(board, color.opposite(), Piece::Pawn, crate::square::Square::from_index(cap_idx));
    } else if let Some(captured) = mv.captured() {
        evaluator.remove_piece(board, color.opposite(), captured, mv.to());
    }

    if let Some(promo) = mv.promotion() {
        evaluator.remove_piece(board, color, Piece::Pawn, mv.from());
        evaluator.add_piece(board, color, promo, mv.to());
    } else {
        evaluator.move_piece(board, color, mv.piece(), mv.from(), mv.to());
    }

    if mv.is_castling() {
        let (rook_from, rook_to) = match mv.to().index() {
            6 => (5u8, 7u8),
            2 => (0, 3),
            62 => (63, 61),
            58 => (56, 59),
            _ => unreachable!("castle move must target a legal rook square"),
        };
        let _ = rook_from;
        let (from_sq, to_sq) = match mv.to().index() {
            6 => (crate::square::Square::from_index(7), crate::square::Square::from_index(5)),
            2 => (crate::square::Square::from_index(0), crate::square::Square::from_index(3)),
            62 => (crate::square::Square::from_index(63), crate::square::Square::from_index(61)),
            58 => (crate::square::Square::from_index(56), crate::square::Square::from_index(59)),
            _ => unreachable!(),
        };
        evaluator.move_piece(board, color, Piece::Rook, from_sq, to_sq);
        let _ = rook_to;
    }
}

fn ln1p(x: f64) -> f64 {
    (x + 1.0).ln()
}

/// Late-move reduction, banded by the move's ordering score (already set by
/// `order_moves` before the picker handed it out).
fn late_move_reduction(score: u8, is_pv: bool, depth: i32, move_no: i32) -> i32 {
    let d = (depth.max(1)) as f64;
    let m = (move_no.max(1)) as f64;
    let pv = if is_pv { 1.0 } else { 0.0 };

    let r = if score <= 180 {
        let s = score as f64;
        -0.5 - 0.2 * ln1p(s) - 2.0 * pv + (2.0 - 0.3 * ln1p(s)) * d.ln() + (0.3 + 0.15 * ln1p(s)) * m.ln()
    } else if (181..=184).contains(&score) {
        0.5 - 0.4 * pv + 1.35 * d.ln() + 0.4 * m.ln()
    } else if (185..=189).contains(&score) {
        -0.85 + 1.35 * d.ln() + 0.4 * m.ln()
    } else if (190..=194).contains(&score) && !is_pv {
        -1.85 + 0.5 * d.ln() + 1.65 * m.ln()
    } else {
        return 0;
    };

    (r.floor() as i32).clamp(0, 4)
}

#[allow(clippy::too_many_arguments)]
fn quiescence(state: &mut SearchState, ply: usize, mut alpha: i32, beta: i32) -> i32 {
    state.nodes += 1;
    if state.nodes % NODES_PER_TIME_CHECK == 0 {
        state.time.check(state.nodes);
    }
    if state.time.stop {
        return 0;
    }
    state.seldepth = state.seldepth.max(ply);

    let side_in_check = in_check(state.board, state.board.side_to_move);

    let stand_pat = if side_in_check { -INF } else { state.evaluator.static_eval(state.board) };
    if !side_in_check {
        if stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
    }

    let mut picker = if side_in_check {
        MovePicker::new_evasion(state.board)
    } else {
        MovePicker::new_quiescence(state.board)
    };

    if side_in_check && picker.is_empty() {
        return -MATE_SCORE + ply as i32;
    }

    let mut best = stand_pat;
    let mut any_move = false;

    while let Some(mv) = picker.next() {
        if !side_in_check {
            let see = state.board.see_value(mv);
            if !mv.is_promotion() && see < 0 {
                continue;
            }
            let captured_value = mv
                .captured()
                .map(see_piece_value)
                .unwrap_or_else(|| see_piece_value(Piece::Pawn));
            let margin = if see > 0 { QS_DELTA_MARGIN } else { QS_DELTA_MARGIN + captured_value };
            if !mv.is_promotion() && stand_pat + margin < alpha {
                if stand_pat + margin > best {
                    best = stand_pat + margin;
                }
                continue;
            }
        }

        any_move = true;
        state.make(ply, mv);
        let score = -quiescence(state, ply + 1, -beta, -alpha);
        state.undo(ply, mv);

        if state.time.stop {
            return 0;
        }
        if score > best {
            best = score;
            if score > alpha {
                alpha = score;
                if score >= beta {
                    return score;
                }
            }
        }
    }

    let _ = any_move;
    best
}

#[allow(clippy::too_many_arguments)]
fn negamax(
    state: &mut SearchState,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    is_pv: bool,
) -> i32 {
    state.nodes += 1;
    if state.nodes % NODES_PER_TIME_CHECK == 0 {
        state.time.check(state.nodes);
    }
    if state.time.stop {
        return 0;
    }
    state.seldepth = state.seldepth.max(ply);

    if ply > 0 {
        if state.board.is_repetition_draw(ply as u32) || state.board.halfmove_clock >= 100 {
            return DRAW_SCORE + (state.nodes as i32 & 1) * DRAW_NOISE - DRAW_NOISE / 2;
        }

        let mate_alpha = alpha.max(-MATE_SCORE + ply as i32);
        let mate_beta = beta.min(MATE_SCORE - ply as i32 - 1);
        if mate_alpha >= mate_beta {
            return mate_alpha;
        }
        alpha = mate_alpha;
    }
    let beta = beta.min(MATE_SCORE - ply as i32 - 1);

    let side_in_check = in_check(state.board, state.board.side_to_move);
    let extension = i32::from(side_in_check);

    if depth <= 0 && !side_in_check {
        return quiescence(state, ply, alpha, beta);
    }

    let key = state.board.zobrist;
    let mut hash_move = None;
    if let Some(hit) = state.tt.probe(key, depth.max(0) as u8, ply as i32) {
        hash_move = hit.best_move;
        if ply > 0 && !is_pv {
            match hit.bound {
                Bound::Exact => return hit.score,
                Bound::Lower if hit.score >= beta => return hit.score,
                Bound::Upper if hit.score <= alpha => return hit.score,
                _ => {}
            }
        }
    }
    if hash_move.is_none() {
        hash_move = state.tt.probe_move(key);
    }

    let static_eval = if side_in_check { 0 } else { state.evaluator.static_eval(state.board) };

    if !is_pv && !side_in_check && depth <= RFP_DEPTH_LIMIT {
        let margin = static_eval - depth * RFP_MARGIN_PER_PLY;
        if margin >= beta {
            return margin;
        }
    }

    let mut depth = depth;
    if !is_pv
        && !side_in_check
        && extension == 0
        && depth == RAZOR_DEPTH
        && state.board.has_major_pieces(state.board.side_to_move)
        && static_eval + RAZOR_MARGIN <= alpha
    {
        depth -= 1;
    }

    if !side_in_check
        && state.null_move_allowed
        && depth > 1
        && state.board.has_major_pieces(state.board.side_to_move)
        && static_eval >= beta
    {
        let reduction = 3 + depth / 4;
        state.null_move_allowed = false;
        make_null_move(state.board);
        let score = -negamax(state, depth - 1 - reduction, ply + 1, -beta, -beta + 1, false);
        undo_null_move(state.board);
        state.null_move_allowed = true;

        if state.time.stop {
            return 0;
        }
        if score >= beta {
            let capped = score.min(MATE_THRESHOLD - 1);
            state.tt.save(key, None, capped, depth as u8, Bound::Lower, ply as i32);
            return capped;
        }
    }

    let mut picker = MovePicker::new(state.board, state.ctx, ply, hash_move);
    if picker.is_empty() {
        return if side_in_check { -MATE_SCORE + ply as i32 } else { DRAW_SCORE };
    }

    let one_reply = picker.len() == 1;

    let futile = !is_pv && !side_in_check && depth <= FP_DEPTH_LIMIT && alpha.abs() < MATE_THRESHOLD && beta.abs() < MATE_THRESHOLD;
    let fmargin = FP_MARGIN_BASE + FP_MARGIN_PER_PLY * depth;

    let original_alpha = alpha;
    let mut best_score = -INF;
    let mut best_move = None;
    let mut move_no = 0i32;

    while let Some(mv) = picker.next() {
        if futile && move_no > 0 && mv.score() <= SCORE_ZERO_SEE_CAPTURE && static_eval + fmargin < alpha {
            if static_eval + fmargin > best_score {
                best_score = static_eval + fmargin;
            }
            break;
        }

        let move_extension = if one_reply { 1 } else { 0 };
        let total_extension = (extension + move_extension).min(1);

        let r = if move_no == 0 || depth < 2 || side_in_check {
            0
        } else {
            late_move_reduction(mv.score(), is_pv, depth, move_no + 1)
        };

        state.make(ply, mv);

        let score = if is_pv && move_no == 0 {
            -negamax(state, depth - 1 + total_extension, ply + 1, -beta, -alpha, true)
        } else {
            let mut s = -negamax(state, depth - 1 + total_extension - r, ply + 1, -alpha - 1, -alpha, false);
            if s > alpha && r > 0 {
                s = -negamax(state, depth - 1 + total_extension, ply + 1, -alpha - 1, -alpha, false);
            }
            if s > alpha && s < beta {
                s = -negamax(state, depth - 1 + total_extension, ply + 1, -beta, -alpha, true);
            }
            s
        };

        state.undo(ply, mv);
        move_no += 1;

        if state.time.stop {
            return 0;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv);

            if score > alpha {
                alpha = score;
            }
            if score >= beta {
                state.tt.save(key, Some(mv), score, depth as u8, Bound::Lower, ply as i32);
                if !mv.is_capture() {
                    state.ctx.update_killer(ply, mv);
                    state.ctx.update_history(state.board.side_to_move, mv, depth);
                }
                return score;
            }
        }
    }

    let bound = if best_score > original_alpha { Bound::Exact } else { Bound::Upper };
    state.tt.save(key, best_move, best_score, depth as u8, bound, ply as i32);

    best_score
}

pub struct SearchReport {
    pub depth: i32,
    pub score: i32,
    pub nodes: u64,
    pub elapsed: Duration,
    pub best_move: Option<Move>,
}

#[allow(clippy::too_many_arguments)]
pub fn iterative_deepening(
    board: &mut Board,
    evaluator: &mut dyn Evaluator,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time: &mut TimeManager,
    mut on_iteration: impl FnMut(&SearchReport),
) -> (i32, Option<Move>) {
    let mut ctx = SearchContext::new();
    tt.new_search();
    ctx.age_history();

    let mut best_score = 0;
    let mut best_move = None;
    let mut nodes_total = 0u64;

    for depth in 1..=max_depth.min(MAX_SEARCH_PLY as i32) {
        let mut alpha = -INF;
        let mut beta = INF;
        if depth >= 4 {
            alpha = (best_score - 25).max(-INF);
            beta = (best_score + 25).min(INF);
        }

        let (score, mv) = loop {
            let mut state = SearchState {
                board,
                evaluator,
                ctx: &mut ctx,
                tt,
                time,
                nodes: 0,
                seldepth: 0,
                null_move_allowed: true,
            };
            let score = negamax(&mut state, depth, 0, alpha, beta, true);
            nodes_total += state.nodes;
            let mv = tt.probe_move(board.zobrist);

            if time.stop {
                break (score, mv);
            }
            if score <= alpha {
                alpha = -INF;
                continue;
            }
            if score >= beta {
                beta = INF;
                continue;
            }
            break (score, mv);
        };

        if time.stop {
            break;
        }

        best_score = score;
        best_move = mv;

        on_iteration(&SearchReport { depth, score, nodes: nodes_total, elapsed: time.elapsed(), best_move });

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
        if time.soft_expired() {
            break;
        }
    }

    (best_score, best_move)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::classical::ClassicalEvaluator;
    use std::str::FromStr;

    #[test]
    fn finds_mate_in_one() {
        let mut board = Board::from_str("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let mut evaluator = ClassicalEvaluator::new();
        let mut tt = TranspositionTable::new(1);
        let mut time = TimeManager::unlimited();
        let (score, mv) = iterative_deepening(&mut board, &mut evaluator, &mut tt, 4, &mut time, |_| {});
        assert!(score >= MATE_THRESHOLD);
        assert!(mv.is_some());
    }

    #[test]
    fn quiescence_is_stable_in_quiet_position() {
        let mut board = Board::new();
        let mut evaluator = ClassicalEvaluator::new();
        let mut ctx = SearchContext::new();
        let mut tt = TranspositionTable::new(1);
        let mut time = TimeManager::unlimited();
        let mut state = SearchState {
            board: &mut board,
            evaluator: &mut evaluator,
            ctx: &mut ctx,
            tt: &mut tt,
            time: &mut time,
            nodes: 0,
            seldepth: 0,
            null_move_allowed: true,
        };
        let score = quiescence(&mut state, 0, -INF, INF);
        assert_eq!(score, 0);
    }
}
