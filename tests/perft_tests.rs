use corvid::board::Board;
use corvid::moves::perft::perft;
use std::str::FromStr;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const EN_PASSANT_PIN: &str = "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1";

#[test]
fn perft_startpos_depth_4() {
    let mut board = Board::new();
    assert_eq!(perft(&mut board, 4), 197_281);
}

#[test]
fn perft_kiwipete_depth_2_and_3() {
    let mut board = Board::from_str(KIWIPETE).unwrap();
    assert_eq!(perft(&mut board, 2), 2_039);
    assert_eq!(perft(&mut board, 3), 97_862);
}

#[test]
fn perft_position_3_depth_4() {
    let mut board = Board::from_str(POSITION_3).unwrap();
    assert_eq!(perft(&mut board, 1), 14);
    assert_eq!(perft(&mut board, 2), 191);
    assert_eq!(perft(&mut board, 3), 2_812);
    assert_eq!(perft(&mut board, 4), 43_238);
}

#[test]
fn perft_en_passant_is_available_at_depth_1() {
    let mut board = Board::from_str(EN_PASSANT_PIN).unwrap();
    // e5xd6 e.p. plus king moves and pawn push.
    assert_eq!(perft(&mut board, 1), 8);
}
