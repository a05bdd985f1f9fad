//! Small shared helpers that don't belong to any one layer.

use crate::board::{Color, Piece};

/// Mirrors a square vertically (rank 0 <-> rank 7), used to flip piece-square
/// tables and mirror-test positions between perspectives.
#[inline(always)]
pub const fn mirror_square(sq: u8) -> u8 {
    sq ^ 56
}

/// Material value used by SEE and move-ordering MVV-LVA, independent of the
/// midgame/endgame tapered values used by the classical evaluator.
#[inline(always)]
pub const fn see_piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 20000,
    }
}

#[inline(always)]
pub const fn opposite(color: Color) -> Color {
    match color {
        Color::White => Color::Black,
        Color::Black => Color::White,
    }
}
