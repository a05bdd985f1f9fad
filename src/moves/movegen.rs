//! Legal move generation (L4): computes king-danger, pin, and check masks
//! once per position, then generates pseudo-moves per piece kind already
//! intersected with those masks. No make/undo filtering pass is needed.

use crate::attacks::{self, tables};
use crate::bitboard::BitboardExt;
use crate::board::{Board, Color, Piece};
use crate::moves::types::{Move, MoveBuffer, MoveKind};
use crate::square::Square;

const RANK2: u64 = 0x0000_0000_0000_FF00;
const RANK7: u64 = 0x00FF_0000_0000_0000;
const RANK1: u64 = 0x0000_0000_0000_00FF;
const RANK8: u64 = 0xFF00_0000_0000_0000;

const WHITE_KINGSIDE_BETWEEN: u64 = 0x0000_0000_0000_0060;
const WHITE_QUEENSIDE_BETWEEN: u64 = 0x0000_0000_0000_000E;
const BLACK_KINGSIDE_BETWEEN: u64 = 0x6000_0000_0000_0000;
const BLACK_QUEENSIDE_BETWEEN: u64 = 0x0E00_0000_0000_0000;

const PROMOS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

const ALL_SQUARES: u64 = !0u64;

/// Union of every square `color`'s pieces attack, given an explicit
/// occupancy bitboard (so callers can remove the defending king to build the
/// king-danger mask).
pub fn attacks_by(board: &Board, color: Color, occ: u64) -> u64 {
    let t = tables();
    let mut bb = 0u64;
    for sq in board.pieces(Piece::Pawn, color).squares() {
        bb |= t.pawn_attacks(sq, color);
    }
    for sq in board.pieces(Piece::Knight, color).squares() {
        bb |= t.knight_attacks(sq);
    }
    for sq in board.pieces(Piece::Bishop, color).squares() {
        bb |= t.bishop_attacks(sq, occ);
    }
    for sq in board.pieces(Piece::Rook, color).squares() {
        bb |= t.rook_attacks(sq, occ);
    }
    for sq in board.pieces(Piece::Queen, color).squares() {
        bb |= t.queen_attacks(sq, occ);
    }
    for sq in board.pieces(Piece::King, color).squares() {
        bb |= t.king_attacks(sq);
    }
    bb
}

/// Bitboard of every `attacker`-colored piece attacking `sq` under `occ`.
pub fn attackers_to(board: &Board, sq: Square, attacker: Color, occ: u64) -> u64 {
    let t = tables();
    let mut bb = 0u64;
    bb |= t.pawn_attacks(sq, attacker.opposite()) & board.pieces(Piece::Pawn, attacker);
    bb |= t.knight_attacks(sq) & board.pieces(Piece::Knight, attacker);
    bb |= t.king_attacks(sq) & board.pieces(Piece::King, attacker);
    bb |= t.bishop_attacks(sq, occ) & (board.pieces(Piece::Bishop, attacker) | board.pieces(Piece::Queen, attacker));
    bb |= t.rook_attacks(sq, occ) & (board.pieces(Piece::Rook, attacker) | board.pieces(Piece::Queen, attacker));
    bb
}

#[inline]
pub fn is_square_attacked(board: &Board, sq: Square, attacker: Color) -> bool {
    attackers_to(board, sq, attacker, board.occupied()) != 0
}

#[inline]
pub fn in_check(board: &Board, side: Color) -> bool {
    is_square_attacked(board, board.king_square(side), side.opposite())
}

/// For each enemy slider with exactly one of our pieces between it and our
/// king on a shared ray, that piece is pinned and may only move within the
/// ray (push into the gap or capture the pinner). Returns a per-square mask
/// table defaulting to "unrestricted".
fn compute_pins(board: &Board, color: Color, king_sq: Square, occ: u64) -> [u64; 64] {
    let t = tables();
    let mut masks = [ALL_SQUARES; 64];
    let own = board.occupancy(color);
    let enemy_diag = board.pieces(Piece::Bishop, color.opposite()) | board.pieces(Piece::Queen, color.opposite());
    let enemy_straight = board.pieces(Piece::Rook, color.opposite()) | board.pieces(Piece::Queen, color.opposite());

    for dir in attacks::Direction::ALL {
        let Some(first) = t.first_blocker(king_sq, dir, occ) else { continue };
        if first.bit() & own == 0 {
            continue;
        }
        let Some(second) = t.first_blocker(first, dir, occ) else { continue };
        let matching = if dir.is_diagonal() { enemy_diag } else { enemy_straight };
        if second.bit() & matching != 0 {
            masks[first.index() as usize] = t.between(king_sq, second) | second.bit();
        }
    }

    masks
}

fn en_passant_is_legal(board: &Board, color: Color, from: Square, ep_sq: Square, cap_sq: Square, king_sq: Square) -> bool {
    let occ = (board.occupied() & !from.bit() & !cap_sq.bit()) | ep_sq.bit();
    let enemy = color.opposite();
    let rank_attackers = tables().rook_attacks(king_sq, occ)
        & (board.pieces(Piece::Rook, enemy) | board.pieces(Piece::Queen, enemy));
    rank_attackers == 0
}

struct Masks {
    push: u64,
    capture: u64,
    pin: [u64; 64],
}

impl Masks {
    #[inline(always)]
    fn allowed(&self, from: Square) -> u64 {
        (self.push | self.capture) & self.pin[from.index() as usize]
    }
}

/// Non-pawn capture/quiet targets don't know the captured kind from the
/// bitboard alone; this variant looks it up on `board` so the `Move`'s
/// captured field is populated correctly.
#[inline(always)]
fn push_targets_typed(board: &Board, from: Square, targets: u64, piece: Piece, out: &mut impl MoveBuffer) {
    for to in targets.squares() {
        let captured = board.piece_type_at(to);
        let kind = if captured.is_some() { MoveKind::Capture } else { MoveKind::Normal };
        out.push(Move::new(from, to, piece, kind, captured, None));
    }
}

fn generate_knight(board: &Board, masks: &Masks, out: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let own = board.occupancy(color);
    let t = tables();
    for from in board.pieces(Piece::Knight, color).squares() {
        let targets = t.knight_attacks(from) & !own & masks.allowed(from);
        push_targets_typed(board, from, targets, Piece::Knight, out);
    }
}

fn generate_slider(board: &Board, masks: &Masks, piece: Piece, out: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let own = board.occupancy(color);
    let occ = board.occupied();
    let t = tables();
    for from in board.pieces(piece, color).squares() {
        let attacks = match piece {
            Piece::Bishop => t.bishop_attacks(from, occ),
            Piece::Rook => t.rook_attacks(from, occ),
            Piece::Queen => t.queen_attacks(from, occ),
            _ => unreachable!(),
        };
        let targets = attacks & !own & masks.allowed(from);
        push_targets_typed(board, from, targets, piece, out);
    }
}

fn generate_king(board: &Board, king_danger: u64, out: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let from = board.king_square(color);
    let own = board.occupancy(color);
    let t = tables();

    let targets = t.king_attacks(from) & !own & !king_danger;
    push_targets_typed(board, from, targets, Piece::King, out);

    if in_check(board, color) {
        return;
    }

    let occ = board.occupied();
    let (kingside_between, kingside_to) = match color {
        Color::White => (WHITE_KINGSIDE_BETWEEN, 6u8),
        Color::Black => (BLACK_KINGSIDE_BETWEEN, 62u8),
    };
    if board.has_kingside_castle(color) && (occ & kingside_between) == 0 {
        let pass = Square::from_index(from.index() + 1);
        let to = Square::from_index(kingside_to);
        if king_danger & (pass.bit() | to.bit()) == 0 {
            out.push(Move::new(from, to, Piece::King, MoveKind::Castle, None, None));
        }
    }

    let (queenside_between, queenside_to) = match color {
        Color::White => (WHITE_QUEENSIDE_BETWEEN, 2u8),
        Color::Black => (BLACK_QUEENSIDE_BETWEEN, 58u8),
    };
    if board.has_queenside_castle(color) && (occ & queenside_between) == 0 {
        let pass = Square::from_index(from.index() - 1);
        let to = Square::from_index(queenside_to);
        if king_danger & (pass.bit() | to.bit()) == 0 {
            out.push(Move::new(from, to, Piece::King, MoveKind::Castle, None, None));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn generate_pawns(board: &Board, masks: &Masks, king_sq: Square, captures_only: bool, out: &mut impl MoveBuffer) {
    let color = board.side_to_move;
    let pawns = board.pieces(Piece::Pawn, color);
    let empty = !board.occupied();
    let enemy = board.opponent_occupancy(color);
    let t = tables();

    // `start_rank` is where pawns begin (gates the double push); the
    // *promoting* pawns are the ones already one step from the back rank,
    // which for White sit on rank 7, not rank 2.
    let (start_rank, promo_source_rank, up): (u64, u64, i8) = match color {
        Color::White => (RANK2, RANK7, 8),
        Color::Black => (RANK7, RANK2, -8),
    };
    let non_promoting = pawns & !promo_source_rank;
    let promoting = pawns & promo_source_rank;

    if !captures_only {
        let single = (if up > 0 { (non_promoting << 8) & empty } else { (non_promoting >> 8) & empty });
        for to in single.squares() {
            let from = Square::from_index((to.index() as i8 - up) as u8);
            if masks.allowed(from) & to.bit() != 0 {
                out.push(Move::new(from, to, Piece::Pawn, MoveKind::Normal, None, None));
            }
        }

        let double = if up > 0 {
            ((((pawns & start_rank) << 8) & empty) << 8) & empty
        } else {
            ((((pawns & start_rank) >> 8) & empty) >> 8) & empty
        };
        for to in double.squares() {
            let from = Square::from_index((to.index() as i8 - 2 * up) as u8);
            if masks.allowed(from) & to.bit() != 0 {
                out.push(Move::new(from, to, Piece::Pawn, MoveKind::DoublePawnPush, None, None));
            }
        }
    }

    for from in non_promoting.squares() {
        let targets = t.pawn_attacks(from, color) & enemy & masks.allowed(from);
        for to in targets.squares() {
            let captured = board.piece_type_at(to);
            out.push(Move::new(from, to, Piece::Pawn, MoveKind::Capture, captured, None));
        }
    }

    let promo_push = if !captures_only {
        if up > 0 { (promoting << 8) & empty } else { (promoting >> 8) & empty }
    } else {
        0
    };
    for to in promo_push.squares() {
        let from = Square::from_index((to.index() as i8 - up) as u8);
        if masks.allowed(from) & to.bit() == 0 {
            continue;
        }
        for &promo in &PROMOS {
            out.push(Move::new(from, to, Piece::Pawn, MoveKind::Promotion, None, Some(promo)));
        }
    }

    for from in promoting.squares() {
        let targets = t.pawn_attacks(from, color) & enemy & masks.allowed(from);
        for to in targets.squares() {
            let captured = board.piece_type_at(to);
            for &promo in &PROMOS {
                out.push(Move::new(from, to, Piece::Pawn, MoveKind::PromotionCapture, captured, Some(promo)));
            }
        }
    }

    if let Some(ep_sq) = board.en_passant_target() {
        let cap_sq = Square::from_index(if color == Color::White { ep_sq.index() - 8 } else { ep_sq.index() + 8 });
        for from in (pawns & !start_rank).squares() {
            if t.pawn_attacks(from, color) & ep_sq.bit() == 0 {
                continue;
            }
            // A king-side check is resolved either by capturing the checking
            // pawn or, for a sliding checker, by the destination square
            // blocking it; either way the landing square must appear in the
            // usual push/capture/pin mask for this pawn.
            if masks.allowed(from) & ep_sq.bit() == 0 {
                continue;
            }
            if en_passant_is_legal(board, color, from, ep_sq, cap_sq, king_sq) {
                out.push(Move::new(from, ep_sq, Piece::Pawn, MoveKind::EnPassant, Some(Piece::Pawn), None));
            }
        }
    }
}

fn build_masks(board: &Board, color: Color, king_sq: Square) -> (Masks, u64, u32) {
    let occ = board.occupied();
    let occ_without_king = occ & !king_sq.bit();
    let king_danger = attacks_by(board, color.opposite(), occ_without_king);

    let checkers = attackers_to(board, king_sq, color.opposite(), occ);
    let num_checkers = checkers.count_ones();

    let (push, capture) = match num_checkers {
        0 => (ALL_SQUARES, ALL_SQUARES),
        1 => {
            let checker_sq = Square::from_index(checkers.lsb());
            let checker_piece = board.piece_type_at(checker_sq).expect("checker square empty");
            let push = if matches!(checker_piece, Piece::Knight | Piece::Pawn) {
                0
            } else {
                tables().between(king_sq, checker_sq)
            };
            (push, checkers)
        }
        _ => (0, 0),
    };

    let pin = compute_pins(board, color, king_sq, occ);
    (Masks { push, capture, pin }, king_danger, num_checkers)
}

/// Generates every legal move in the position into `moves`.
pub fn generate_legal_moves(board: &Board, moves: &mut impl MoveBuffer) {
    moves.clear();
    let color = board.side_to_move;
    let king_sq = board.king_square(color);
    let (masks, king_danger, num_checkers) = build_masks(board, color, king_sq);

    if num_checkers < 2 {
        generate_pawns(board, &masks, king_sq, false, moves);
        generate_knight(board, &masks, moves);
        generate_slider(board, &masks, Piece::Bishop, moves);
        generate_slider(board, &masks, Piece::Rook, moves);
        generate_slider(board, &masks, Piece::Queen, moves);
    }
    generate_king(board, king_danger, moves);
}

/// Generates legal captures, promotions, and check-giving en-passant only;
/// used by quiescence search.
pub fn generate_legal_captures(board: &Board, moves: &mut impl MoveBuffer) {
    moves.clear();
    let color = board.side_to_move;
    let king_sq = board.king_square(color);
    let (masks, king_danger, num_checkers) = build_masks(board, color, king_sq);

    if num_checkers < 2 {
        generate_pawns(board, &masks, king_sq, true, moves);

        let occ = board.occupied();
        let enemy = board.opponent_occupancy(color);
        let t = tables();

        for from in board.pieces(Piece::Knight, color).squares() {
            let targets = t.knight_attacks(from) & enemy & masks.allowed(from);
            push_targets_typed(board, from, targets, Piece::Knight, moves);
        }
        for from in board.pieces(Piece::Bishop, color).squares() {
            let targets = t.bishop_attacks(from, occ) & enemy & masks.allowed(from);
            push_targets_typed(board, from, targets, Piece::Bishop, moves);
        }
        for from in board.pieces(Piece::Rook, color).squares() {
            let targets = t.rook_attacks(from, occ) & enemy & masks.allowed(from);
            push_targets_typed(board, from, targets, Piece::Rook, moves);
        }
        for from in board.pieces(Piece::Queen, color).squares() {
            let targets = t.queen_attacks(from, occ) & enemy & masks.allowed(from);
            push_targets_typed(board, from, targets, Piece::Queen, moves);
        }
    }

    let from = king_sq;
    let enemy = board.opponent_occupancy(color);
    let own = board.occupancy(color);
    let targets = tables().king_attacks(from) & enemy & !king_danger & !own;
    push_targets_typed(board, from, targets, Piece::King, moves);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::types::MoveBuffer as _;
    use std::str::FromStr;

    fn legal_moves(fen: &str) -> Vec<Move> {
        let board = Board::from_str(fen).unwrap();
        let mut moves: Vec<Move> = Vec::new();
        generate_legal_moves(&board, &mut moves);
        moves
    }

    #[test]
    fn startpos_has_twenty_moves() {
        assert_eq!(
            legal_moves("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").len(),
            20
        );
    }

    #[test]
    fn king_in_check_restricts_to_evasions() {
        // Black rook checks along the e-file; only the d2 pawn capturing it
        // or a king move off the file/rank is legal.
        let moves = legal_moves("4k3/8/8/8/8/4r3/3P4/4K3 w - - 0 1");
        assert!(moves.iter().all(|m| m.piece() == Piece::King || m.to().index() == 20));
    }

    #[test]
    fn pinned_pawn_cannot_leave_pin_ray() {
        // a1-b2-c3 diagonal: the b2 pawn is pinned by the c3 bishop and may
        // only capture along the pin, not push to b3/b4.
        let board = Board::from_str("4k3/8/8/8/8/2b5/1P6/K7 w - - 0 1").unwrap();
        let mut moves: Vec<Move> = Vec::new();
        generate_legal_moves(&board, &mut moves);
        let pawn_moves: Vec<_> = moves.iter().filter(|m| m.piece() == Piece::Pawn).collect();
        assert_eq!(pawn_moves.len(), 1);
        assert_eq!(pawn_moves[0].to().index(), 18);
    }

    #[test]
    fn double_check_only_allows_king_moves() {
        // Rook on e2 and knight on d3 both check the white king on e1.
        let board = Board::from_str("4k3/8/8/8/8/3n4/4r3/4K3 w - - 0 1").unwrap();
        let mut moves: Vec<Move> = Vec::new();
        generate_legal_moves(&board, &mut moves);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.piece() == Piece::King));
    }

    #[test]
    fn castling_through_attacked_square_is_illegal() {
        // King isn't in check, but f1 (the kingside pass-through square) is
        // swept by the f8 rook.
        let board = Board::from_str("5r2/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let mut moves: Vec<Move> = Vec::new();
        generate_legal_moves(&board, &mut moves);
        assert!(!moves.iter().any(|m| m.is_castling()));
    }
}
