use arrayvec::ArrayVec;
use corvid::board::Board;
use corvid::moves::execute::generate_legal;
use corvid::moves::types::Move;
use corvid::search::see::SeeExt;
use corvid::square::Square;
use std::str::FromStr;

fn find_move(board: &mut Board, from_str: &str, to_str: &str) -> Move {
    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, &mut moves);

    let from = Square::from_str(from_str).unwrap();
    let to = Square::from_str(to_str).unwrap();

    *moves
        .iter()
        .find(|m| m.from() == from && m.to() == to)
        .unwrap_or_else(|| panic!("move {from_str}{to_str} not found or illegal in pos: {}", board.to_fen()))
}

#[test]
fn rook_takes_protected_pawn_is_losing() {
    // R(d1)xP(d4) [+100] -> R(d8)xR(d4) [-500]. Net -400.
    let fen = "3r4/8/8/8/3p4/8/8/3RK3 w - - 0 1";
    let mut board = Board::from_str(fen).expect("invalid FEN");
    let m = find_move(&mut board, "d1", "d4");
    assert!(!board.see_ge(m, 0), "RxP protected by a rook should be bad");
}

#[test]
fn battery_capture_is_winning() {
    // Q(a2)xR(a8) [+500] -> K(h8)xQ(a8) [-900] -> R(a1)xQ(a8) [+900]. Net +500.
    let fen = "r6k/8/8/8/8/8/Q7/R6K w - - 0 1";
    let mut board = Board::from_str(fen).unwrap();
    let m = find_move(&mut board, "a2", "a8");
    assert!(board.see_ge(m, 0), "battery capture should be good");
}

#[test]
fn pruning_threshold_accepts_bounded_losses() {
    // N(e2)xP(d4) [+100] -> K(e5)xN(d4) [-320]. Net -220.
    let fen = "8/8/8/4k3/3p4/8/4N3/3K4 w - - 0 1";
    let mut board = Board::from_str(fen).unwrap();
    let m = find_move(&mut board, "e2", "d4");

    assert!(!board.see_ge(m, 0), "NxP should be bad at threshold 0");
    assert!(board.see_ge(m, -300), "NxP should clear a -300 threshold (-220 > -300)");
}

#[test]
fn en_passant_victim_is_resolved_on_its_own_square() {
    // The en passant victim sits on e5's landing file but a rank off the
    // destination square; SEE must price the pawn that's actually captured.
    let fen = "rnbqkbnr/ppppp1pp/8/4Pp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 1";
    let mut board = Board::from_str(fen).unwrap();
    let m = find_move(&mut board, "e5", "f6");
    assert!(board.see_ge(m, 0), "pawn for pawn en passant should not net negative");
}

#[test]
fn promotion_capture_nets_huge_gain() {
    let fen = "1r6/P7/8/8/8/8/8/K7 w - - 0 1";
    let mut board = Board::from_str(fen).unwrap();
    let m = find_move(&mut board, "a7", "b8");
    assert!(board.see_ge(m, 1000), "rook capture plus promotion should clear a huge threshold");
}
