use corvid::board::Board;
use corvid::eval::classical::ClassicalEvaluator;
use corvid::eval::Evaluator;
use std::str::FromStr;

#[test]
fn startpos_is_close_to_balanced() {
    let board = Board::new();
    let mut eval = ClassicalEvaluator::new();
    let score = eval.static_eval(&board);
    assert!(score.abs() < 50, "startpos should be near zero, got {score}");
}

#[test]
fn extra_queen_is_a_large_material_advantage() {
    let board = Board::from_str("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
    let mut eval = ClassicalEvaluator::new();
    let score = eval.static_eval(&board);
    assert!(score > 800, "a lone extra queen should score as a large edge, got {score}");
}

#[test]
fn side_to_move_perspective_flips_with_color() {
    // Same material imbalance, but it's black's turn: a queen down for the
    // side to move should score strongly negative from black's perspective.
    let board = Board::from_str("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
    let mut eval = ClassicalEvaluator::new();
    let score = eval.static_eval(&board);
    assert!(score < -800, "black to move down a queen should score strongly negative, got {score}");
}

#[test]
fn bishop_pair_is_valued_above_a_lone_bishop() {
    let pair = Board::from_str("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1").unwrap();
    let lone = Board::from_str("4k3/8/8/8/8/8/8/3BK3 w - - 0 1").unwrap();
    let mut eval = ClassicalEvaluator::new();
    let pair_score = eval.static_eval(&pair);
    let lone_score = eval.static_eval(&lone);
    assert!(pair_score > lone_score, "two bishops should outscore one beyond raw material");
}
