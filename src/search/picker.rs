//! Staged move picker (L8): hands moves to the searcher one at a time in
//! priority order (hash move, then ordering-table bands) without the caller
//! needing to hold or re-sort the whole list itself.
//!
//! Legal move generation here already resolves pins and check evasions up
//! front (see `movegen::generate_legal_moves`), so unlike a pseudo-legal
//! generator there is nothing left to validate per-move; staging is purely
//! about priority order, not legality filtering.

use crate::board::Board;
use crate::moves::movegen::{generate_legal_captures, generate_legal_moves};
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::ordering::{order_evasion_moves, order_moves, order_quiescence_moves};
use arrayvec::ArrayVec;

pub struct MovePicker {
    moves: ArrayVec<Move, 256>,
    index: usize,
}

impl MovePicker {
    /// Full-width search picker: all legal moves, ordered by hash move,
    /// SEE-classified captures, killers, and history.
    pub fn new(board: &Board, ctx: &SearchContext, ply: usize, hash_move: Option<Move>) -> Self {
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal_moves(board, &mut moves);
        order_moves(&mut moves, board, ctx, ply, hash_move);
        Self { moves, index: 0 }
    }

    /// Quiescence picker: captures and promotions only, ranked by SEE.
    pub fn new_quiescence(board: &Board) -> Self {
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal_captures(board, &mut moves);
        order_quiescence_moves(&mut moves, board);
        Self { moves, index: 0 }
    }

    /// Evasion picker: used when quiescence is entered in check, where every
    /// legal move matters and captures should still be tried first.
    pub fn new_evasion(board: &Board) -> Self {
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal_moves(board, &mut moves);
        order_evasion_moves(&mut moves);
        Self { moves, index: 0 }
    }

    pub fn next(&mut self) -> Option<Move> {
        let mv = self.moves.get(self.index).copied();
        self.index += 1;
        mv
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[test]
    fn hash_move_is_tried_first() {
        let board = Board::new();
        let ctx = SearchContext::new();
        let mut probe: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal_moves(&board, &mut probe);
        let hash_move = probe[10];

        let mut picker = MovePicker::new(&board, &ctx, 0, Some(hash_move));
        assert_eq!(picker.next(), Some(hash_move));
    }

    #[test]
    fn quiescence_picker_only_yields_captures_and_promotions() {
        use std::str::FromStr;
        let board =
            Board::from_str("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
                .unwrap();
        let mut picker = MovePicker::new_quiescence(&board);
        while let Some(mv) = picker.next() {
            assert!(mv.is_capture() || mv.is_promotion());
        }
    }

    #[test]
    fn full_picker_covers_every_legal_move() {
        let board = Board::new();
        let ctx = SearchContext::new();
        let mut reference: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal_moves(&board, &mut reference);

        let mut picker = MovePicker::new(&board, &ctx, 0, None);
        assert_eq!(picker.len(), reference.len());
        let mut seen = 0;
        while picker.next().is_some() {
            seen += 1;
        }
        assert_eq!(seen, reference.len());
    }
}
