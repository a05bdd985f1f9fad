use arrayvec::ArrayVec;
use corvid::board::Board;
use corvid::moves::execute::{generate_legal, make_move};
use corvid::moves::types::Move;
use corvid::square::Square;
use std::str::FromStr;

fn play(board: &mut Board, from_str: &str, to_str: &str) {
    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, &mut moves);
    let from = Square::from_str(from_str).unwrap();
    let to = Square::from_str(to_str).unwrap();
    let mv = *moves
        .iter()
        .find(|m| m.from() == from && m.to() == to)
        .unwrap_or_else(|| panic!("{from_str}{to_str} not legal in {}", board.to_fen()));
    make_move(board, mv);
}

#[test]
fn halfmove_clock_resets_on_pawn_push_and_capture() {
    let mut b = Board::new();

    play(&mut b, "g1", "f3");
    assert_eq!(b.halfmove_clock, 1);
    play(&mut b, "g8", "f6");
    assert_eq!(b.halfmove_clock, 2);

    play(&mut b, "e2", "e4");
    assert_eq!(b.halfmove_clock, 0, "pawn push resets the clock");
    play(&mut b, "d7", "d5");
    assert_eq!(b.halfmove_clock, 0);

    play(&mut b, "e4", "d5");
    assert_eq!(b.halfmove_clock, 0, "capture resets the clock");
}

#[test]
fn fifty_move_draw_is_flagged_at_the_clock_threshold() {
    let mut b = Board::from_str("4k3/8/8/8/8/8/8/4K3 w - - 99 60").unwrap();
    assert!(b.halfmove_clock < 100);

    play(&mut b, "e1", "d1");
    assert!(b.halfmove_clock >= 100);
}

#[test]
fn threefold_repetition_is_reported_over_claim_based_outcomes() {
    let mut b = Board::new();
    for _ in 0..2 {
        play(&mut b, "g1", "f3");
        play(&mut b, "g8", "f6");
        play(&mut b, "f3", "g1");
        play(&mut b, "f6", "g8");
    }
    assert!(b.is_threefold());
    assert_eq!(b.repetition_count(), 3);
}
