use std::str::FromStr;

use arrayvec::ArrayVec;
use corvid::board::Board;
use corvid::moves::execute::generate_legal;
use corvid::moves::types::Move;
use corvid::square::Square;

fn legal_moves(board: &mut Board) -> ArrayVec<Move, 256> {
    let mut moves = ArrayVec::new();
    generate_legal(board, &mut moves);
    moves
}

fn has_move(moves: &[Move], from: &str, to: &str) -> bool {
    let f = Square::from_str(from).unwrap();
    let t = Square::from_str(to).unwrap();
    moves.iter().any(|m| m.from() == f && m.to() == t)
}

#[test]
fn self_check_is_filtered_out() {
    // White: Ke1, Re2. Black: Re8. Moving Re2->f2 exposes e-file -> illegal.
    let fen = "4r3/8/8/8/8/8/4R3/4K3 w - - 0 1";
    let mut b = Board::from_str(fen).unwrap();

    let legal = legal_moves(&mut b);

    assert!(!has_move(&legal, "e2", "f2"), "Move e2f2 should be filtered (self-check).");
    assert!(has_move(&legal, "e2", "e3"), "Blocking move e2e3 should remain legal.");
}

#[test]
fn checking_moves_are_kept() {
    // White: Re1, Kh1. Black: Ke8, Ne7. Re1xe7+ should be legal.
    let fen = "4k3/4n3/8/8/8/8/8/4R2K w - - 0 1";
    let mut b = Board::from_str(fen).unwrap();

    let legal = legal_moves(&mut b);

    assert!(has_move(&legal, "e1", "e7"), "Checking capture e1e7 should not be filtered out.");
}

#[test]
fn en_passant_is_illegal_when_pawn_is_pinned_opening_file_on_own_king() {
    // White king e1, white pawn e5, black rook e8, black pawn d5. EP target d6;
    // e5xd6 e.p. would open the e-file onto the king on e1.
    let fen = "k3r3/8/8/3pP3/8/8/8/4K2R w - d6 0 1";
    let mut b = Board::from_str(fen).unwrap();

    let moves = legal_moves(&mut b);

    assert!(
        !moves.iter().any(|m| m.is_en_passant()
            && m.from() == Square::from_str("e5").unwrap()
            && m.to() == Square::from_str("d6").unwrap()),
        "EP capture that exposes own king must be filtered out by the legality checker"
    );
}
