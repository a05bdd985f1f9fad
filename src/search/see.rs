//! Static Exchange Evaluation (L6): replays captures on a single square,
//! always swapping in the least valuable attacker, including x-ray
//! attackers revealed as sliders are uncovered. Shares the attacker-bitboard
//! helper with legal move generation rather than re-deriving it.

use crate::bitboard::BitboardExt;
use crate::board::{Board, Color, Piece};
use crate::moves::movegen::attackers_to;
use crate::moves::types::Move;
use crate::square::Square;
use crate::utils::see_piece_value;

pub trait SeeExt {
    /// True when the exchange on `mv`'s destination square nets at least
    /// `threshold` centipawns for the side to move.
    fn see_ge(&self, mv: Move, threshold: i32) -> bool;
    /// Signed material balance of the full exchange, from the side to
    /// move's perspective.
    fn see_value(&self, mv: Move) -> i32;
}

/// Attackers of `sq` that are still present in `occ`. `attackers_to` derives
/// pawn/knight/king membership straight from `board.pieces()`, which does
/// not shrink as the exchange simulation removes pieces, so the result is
/// masked by `occ` to drop attackers already consumed earlier in the swap.
fn attackers_to_square(board: &Board, sq: Square, occ: u64) -> u64 {
    (attackers_to(board, sq, Color::White, occ) | attackers_to(board, sq, Color::Black, occ)) & occ
}

fn least_valuable_attacker(board: &Board, attackers: u64, side: Color) -> Option<(Square, Piece)> {
    let side_attackers = attackers & board.occupancy(side);
    if side_attackers == 0 {
        return None;
    }
    for piece in [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King] {
        let subset = side_attackers & board.pieces(piece, side);
        if subset != 0 {
            return Some((Square::from_index(subset.lsb()), piece));
        }
    }
    None
}

fn exchange_gain(board: &Board, mv: Move) -> [i32; 32] {
    let to_sq = mv.to();
    let from_sq = mv.from();

    let mut next_victim_value = if mv.is_en_passant() {
        see_piece_value(Piece::Pawn)
    } else {
        match board.piece_type_at(to_sq) {
            Some(p) => see_piece_value(p),
            None => return [0; 32],
        }
    };
    if let Some(promo) = mv.promotion() {
        next_victim_value += see_piece_value(promo) - see_piece_value(Piece::Pawn);
    }

    let mut gain = [0i32; 32];
    let mut depth = 0usize;
    gain[0] = next_victim_value;

    let mut next_attacker_value = match mv.promotion() {
        Some(p) => see_piece_value(p),
        None => see_piece_value(mv.piece()),
    };

    let mut occ = board.occupied() & !from_sq.bit();
    let mut attackers = attackers_to_square(board, to_sq, occ);
    let mut side = board.side_to_move.opposite();

    loop {
        let Some((attacker_sq, attacker_piece)) = least_valuable_attacker(board, attackers, side) else {
            break;
        };
        depth += 1;
        if depth >= 32 {
            break;
        }

        gain[depth] = next_attacker_value - gain[depth - 1];

        attackers &= !attacker_sq.bit();
        occ &= !attacker_sq.bit();
        if matches!(attacker_piece, Piece::Bishop | Piece::Rook | Piece::Queen) {
            attackers = attackers_to_square(board, to_sq, occ);
        }

        next_attacker_value = see_piece_value(attacker_piece);
        side = side.opposite();
    }

    while depth > 0 {
        gain[depth - 1] = -gain[depth - 1].max(-gain[depth]);
        depth -= 1;
    }

    gain
}

impl SeeExt for Board {
    fn see_ge(&self, mv: Move, threshold: i32) -> bool {
        exchange_gain(self, mv)[0] >= threshold
    }

    fn see_value(&self, mv: Move) -> i32 {
        exchange_gain(self, mv)[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::execute::generate_legal;
    use crate::moves::types::MoveBuffer;
    use arrayvec::ArrayVec;
    use std::str::FromStr;

    fn find_move(board: &Board, from: &str, to: &str) -> Move {
        let mut moves: ArrayVec<Move, 64> = ArrayVec::new();
        generate_legal(board, &mut moves);
        let from = Square::try_from(from).unwrap();
        let to = Square::try_from(to).unwrap();
        moves.iter().copied().find(|m| m.from() == from && m.to() == to).unwrap()
    }

    #[test]
    fn winning_pawn_takes_knight_is_positive() {
        let board = Board::from_str("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mv = find_move(&board, "e4", "d5");
        assert!(board.see_value(mv) > 0);
    }

    #[test]
    fn losing_exchange_is_negative() {
        let board = Board::from_str("4k3/3r4/3n4/4P3/8/8/8/4K3 w - - 0 1").unwrap();
        let mv = find_move(&board, "e5", "d6");
        assert!(board.see_value(mv) < 0);
    }
}
