//! Move ordering (L8): scores each move into the packed `Move`'s 8-bit
//! ordering byte, then sorts descending so the highest-scored move is tried
//! first. Bands are taken from the interior-search scoring table: hash move
//! at the top, then promotions, SEE-positive captures, killers, history-
//! ranked quiets, SEE-negative captures, and underpromotions last.

use crate::board::{Board, Piece};
use crate::moves::types::{Move, MoveKind};
use crate::search::context::SearchContext;
use crate::search::see::SeeExt;

const SCORE_HASH_MOVE: u8 = 255;
const SCORE_QUEEN_PROMO_CAPTURE: u8 = 254;
const SCORE_QUEEN_PROMO: u8 = 253;
const SEE_POSITIVE_LO: u8 = 241;
const SEE_POSITIVE_HI: u8 = 249;
pub const SCORE_ZERO_SEE_CAPTURE: u8 = 240;
const KILLER_LO: u8 = 190;
const KILLER_HI: u8 = 194;
const SEE_NEGATIVE_LO: u8 = 181;
const SEE_NEGATIVE_HI: u8 = 189;
const QUIET_LO: u8 = 1;
const QUIET_HI: u8 = 180;
const SCORE_UNDERPROMOTION: u8 = 0;

fn is_same_move(a: Move, b: Move) -> bool {
    a == b
}

/// Scores every move in place (via `Move::set_score`) and sorts descending.
/// `ply` selects which killer slots apply (this ply's pair, plus the pair
/// from two plies back, for the lower killer band).
pub fn order_moves(
    moves: &mut [Move],
    board: &Board,
    ctx: &SearchContext,
    ply: usize,
    hash_move: Option<Move>,
) {
    for mv in moves.iter_mut() {
        let score = score_move(*mv, board, ctx, ply, hash_move);
        mv.set_score(score);
    }
    moves.sort_by(|a, b| b.score().cmp(&a.score()));
}

fn score_move(mv: Move, board: &Board, ctx: &SearchContext, ply: usize, hash_move: Option<Move>) -> u8 {
    if let Some(hm) = hash_move {
        if is_same_move(mv, hm) {
            return SCORE_HASH_MOVE;
        }
    }

    if mv.is_promotion() {
        if mv.promotion() == Some(Piece::Queen) {
            return if mv.is_capture() { SCORE_QUEEN_PROMO_CAPTURE } else { SCORE_QUEEN_PROMO };
        }
        if mv.is_capture() {
            return see_capture_score(board, mv);
        }
        return SCORE_UNDERPROMOTION;
    }

    if mv.is_capture() {
        return see_capture_score(board, mv);
    }

    if Some(mv) == ctx.killer_at(ply, 0) {
        return KILLER_HI;
    }
    if Some(mv) == ctx.killer_at(ply, 1) {
        return KILLER_HI - 1;
    }
    if ply >= 2 {
        if Some(mv) == ctx.killer_at(ply - 2, 0) {
            return KILLER_LO + 1;
        }
        if Some(mv) == ctx.killer_at(ply - 2, 1) {
            return KILLER_LO;
        }
    }

    history_score(board, mv, ctx)
}

fn see_capture_score(board: &Board, mv: Move) -> u8 {
    let see = board.see_value(mv);
    if see > 0 {
        let scaled = (see.min(900) * (SEE_POSITIVE_HI - SEE_POSITIVE_LO) as i32 / 900) as u8;
        SEE_POSITIVE_LO + scaled
    } else if see == 0 {
        SCORE_ZERO_SEE_CAPTURE
    } else {
        let scaled = ((-see).min(900) * (SEE_NEGATIVE_HI - SEE_NEGATIVE_LO) as i32 / 900) as u8;
        SEE_NEGATIVE_HI - scaled
    }
}

fn history_score(board: &Board, mv: Move, ctx: &SearchContext) -> u8 {
    if ctx.max_history <= 0 {
        return QUIET_LO;
    }
    let raw = ctx.history_score(board.side_to_move, mv).max(0);
    let scaled = (raw as i64 * (QUIET_HI - QUIET_LO) as i64 / ctx.max_history as i64) as u8;
    QUIET_LO + scaled
}

/// Quiescence-search scoring: promotions first, captures ranked by SEE
/// clamped to +-1000 and mapped into [1, 254], everything else last.
pub fn order_quiescence_moves(moves: &mut [Move], board: &Board) {
    for mv in moves.iter_mut() {
        let score = if mv.kind() == MoveKind::Promotion || mv.kind() == MoveKind::PromotionCapture {
            255
        } else if mv.is_capture() {
            let see = board.see_value(*mv).clamp(-1000, 1000);
            (((see + 1000) * 253 / 2000) + 1) as u8
        } else {
            0
        };
        mv.set_score(score);
    }
    moves.sort_by(|a, b| b.score().cmp(&a.score()));
}

/// Evasion scoring: captures outrank everything else, order within each
/// group is otherwise whatever move generation produced.
pub fn order_evasion_moves(moves: &mut [Move]) {
    moves.sort_by_key(|m| std::cmp::Reverse(m.is_capture()));
}
