//! Evaluation (L5): a shared `Evaluator` trait over a classical
//! material/PSQT/structure evaluator and an NNUE network, selected at the
//! orchestrator layer by the `ClassicalEval`/`NNUE_Path` options.

pub mod classical;
pub mod nnue;
pub mod pesto;

use crate::board::{Board, Color, Piece};
use crate::square::Square;

/// Total non-pawn, non-king phase material: knight/bishop/rook count as 1,
/// queen as 2, summed over both sides. Maxes out at 16 with a full set of
/// minors, rooks and queens on the board.
pub const MAX_PHASE: i32 = 16;

pub fn game_phase(board: &Board) -> i32 {
    let mut phase = 0;
    for &color in &[Color::White, Color::Black] {
        phase += board.pieces(Piece::Knight, color).count_ones() as i32;
        phase += board.pieces(Piece::Bishop, color).count_ones() as i32;
        phase += board.pieces(Piece::Rook, color).count_ones() as i32;
        phase += 2 * board.pieces(Piece::Queen, color).count_ones() as i32;
    }
    phase.min(MAX_PHASE)
}

#[inline(always)]
pub fn taper(mg: i32, eg: i32, phase: i32) -> i32 {
    (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE
}

/// Common surface for the classical and NNUE evaluators. The classical
/// evaluator recomputes everything from the board on every call, so its
/// incremental hooks are no-ops; NNUE uses them to keep its accumulators in
/// sync with make/undo instead of rebuilding from scratch each node.
pub trait Evaluator {
    /// Centipawn score from `board.side_to_move`'s perspective.
    fn static_eval(&mut self, board: &Board) -> i32;

    /// `board` already reflects the piece at its new position; NNUE uses it
    /// to look up the current king buckets, the classical evaluator ignores
    /// it entirely.
    fn add_piece(&mut self, board: &Board, color: Color, piece: Piece, sq: Square);
    fn remove_piece(&mut self, board: &Board, color: Color, piece: Piece, sq: Square);
    fn move_piece(&mut self, board: &Board, color: Color, piece: Piece, from: Square, to: Square) {
        self.remove_piece(board, color, piece, from);
        self.add_piece(board, color, piece, to);
    }

    /// Snapshots incremental state before a make, keyed by ply, so `restore`
    /// can undo by copy instead of replaying inverse updates.
    fn snapshot(&mut self, ply: usize);
    fn restore(&mut self, ply: usize);
}

/// Returns true when no pawns remain and the only non-king piece left on the
/// whole board is a single knight or bishop, the textbook insufficient-
/// material draw the spec carves out as a hard zero regardless of PSQT
/// noise. King vs king, and king+minor vs king, both qualify; two minors
/// anywhere on the board (even one per side) do not, since mate still exists
/// in that material.
pub fn is_trivially_drawn(board: &Board) -> bool {
    let pawns = board.pieces(Piece::Pawn, Color::White) | board.pieces(Piece::Pawn, Color::Black);
    if pawns != 0 {
        return false;
    }
    let queens = board.pieces(Piece::Queen, Color::White).count_ones() + board.pieces(Piece::Queen, Color::Black).count_ones();
    let rooks = board.pieces(Piece::Rook, Color::White).count_ones() + board.pieces(Piece::Rook, Color::Black).count_ones();
    if queens > 0 || rooks > 0 {
        return false;
    }
    let minors = board.pieces(Piece::Knight, Color::White).count_ones()
        + board.pieces(Piece::Knight, Color::Black).count_ones()
        + board.pieces(Piece::Bishop, Color::White).count_ones()
        + board.pieces(Piece::Bishop, Color::Black).count_ones();
    minors <= 1
}
