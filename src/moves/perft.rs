//! Move-count/perft harness (L4 test tool): walks the legal move tree to a
//! fixed depth, with an optional per-move breakdown for debugging movegen
//! regressions against known node counts.

use crate::board::Board;
use crate::moves::execute::{generate_legal, make_move, undo_move};
use crate::moves::movegen::in_check;
use crate::moves::types::Move;
use tracing::{debug, instrument};

const MAX_LOG_DEPTH: u32 = 3;
const MAX_PERFT_DEPTH: usize = 20;

pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounters {
    pub fn zero() -> Self {
        Self {
            nodes: 0,
            captures: 0,
            ep_captures: 0,
            castles: 0,
            promotions: 0,
            checks: 0,
            checkmates: 0,
        }
    }

    pub fn add(&mut self, o: &PerftCounters) {
        self.nodes += o.nodes;
        self.captures += o.captures;
        self.ep_captures += o.ep_captures;
        self.castles += o.castles;
        self.promotions += o.promotions;
        self.checks += o.checks;
        self.checkmates += o.checkmates;
    }
}

fn create_move_buffer_array() -> [Vec<Move>; MAX_PERFT_DEPTH] {
    std::array::from_fn(|_| Vec::with_capacity(64))
}

#[inline]
fn sq_as_a1_zero(idx: u8) -> String {
    let file = idx % 8;
    let rank = idx / 8;
    format!("{}{}", (b'a' + file) as char, (b'1' + rank) as char)
}

fn perft_recursive(board: &mut Board, depth: u32, ply: usize, move_buffers: &mut [Vec<Move>]) -> u64 {
    if depth == 0 {
        return 1;
    }

    {
        let moves = &mut move_buffers[ply];
        generate_legal(board, moves);
    }

    let move_count = move_buffers[ply].len();
    let mut node_count = 0;

    for i in 0..move_count {
        let mv = move_buffers[ply][i];
        make_move(board, mv);
        node_count += perft_recursive(board, depth - 1, ply + 1, move_buffers);
        undo_move(board, mv);
    }

    node_count
}

#[instrument(skip(board), fields(depth))]
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth as usize > MAX_PERFT_DEPTH {
        panic!("depth {depth} exceeds MAX_PERFT_DEPTH {MAX_PERFT_DEPTH}");
    }
    let mut move_buffers = create_move_buffer_array();
    perft_recursive(board, depth, 0, &mut move_buffers)
}

#[instrument(skip(board), fields(depth))]
pub fn perft_divide(board: &mut Board, depth: u32) -> u64 {
    if depth as usize > MAX_PERFT_DEPTH {
        panic!("depth {depth} exceeds MAX_PERFT_DEPTH {MAX_PERFT_DEPTH}");
    }
    let mut move_buffers = create_move_buffer_array();

    {
        let moves = &mut move_buffers[0];
        generate_legal(board, moves);
        if depth <= MAX_LOG_DEPTH {
            debug!(depth, moves = moves.len(), "divide: root legal moves");
        }
    }

    let mut total = 0;
    let move_count = move_buffers[0].len();

    for i in 0..move_count {
        let mv = move_buffers[0][i];

        if depth <= MAX_LOG_DEPTH {
            let from = mv.from().index();
            let to = mv.to().index();
            debug!(%mv, depth, from_a1 = %sq_as_a1_zero(from), to_a1 = %sq_as_a1_zero(to), "divide: exploring root move");
        }

        make_move(board, mv);
        let count = if depth == 1 { 1 } else { perft_recursive(board, depth - 1, 1, &mut move_buffers) };
        undo_move(board, mv);

        if depth <= MAX_LOG_DEPTH {
            debug!(%mv, nodes = count, "divide: root child total");
        }

        println!("{mv}: {count}");
        total += count;
    }

    debug!(depth, total, "divide: total");
    println!("Total: {total}");
    total
}

fn perft_count_recursive(board: &mut Board, depth: u32, ply: usize, out: &mut PerftCounters, move_buffers: &mut [Vec<Move>]) {
    if depth == 0 {
        out.nodes += 1;

        let side_in_check = in_check(board, board.side_to_move);
        if side_in_check {
            out.checks += 1;
        }

        {
            let tmp = &mut move_buffers[ply];
            generate_legal(board, tmp);
        }

        if move_buffers[ply].is_empty() && side_in_check {
            out.checkmates += 1;
        }
        return;
    }

    {
        let moves = &mut move_buffers[ply];
        generate_legal(board, moves);
    }

    let move_count = move_buffers[ply].len();
    for i in 0..move_count {
        let mv = move_buffers[ply][i];

        if mv.is_capture() {
            out.captures += 1;
            if mv.is_en_passant() {
                out.ep_captures += 1;
            }
        }
        if mv.is_castling() {
            out.castles += 1;
        }
        if mv.is_promotion() {
            out.promotions += 1;
        }

        #[cfg(debug_assertions)]
        let z0 = board.zobrist;

        make_move(board, mv);
        perft_count_recursive(board, depth - 1, ply + 1, out, move_buffers);
        undo_move(board, mv);

        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(board.zobrist, z0, "zobrist changed across make/undo");
            debug_assert_eq!(board.compute_zobrist_full(), board.zobrist, "full recompute mismatch");
        }
    }
}

pub fn perft_count_with_breakdown(board: &mut Board, depth: u32, out: &mut PerftCounters) {
    if depth as usize > MAX_PERFT_DEPTH {
        panic!("depth {depth} exceeds MAX_PERFT_DEPTH {MAX_PERFT_DEPTH}");
    }
    let mut move_buffers = create_move_buffer_array();
    perft_count_recursive(board, depth, 0, out, &mut move_buffers);
}

pub fn perft_divide_with_breakdown(board: &mut Board, depth: u32) -> Vec<(Move, PerftCounters)> {
    if depth as usize > MAX_PERFT_DEPTH {
        panic!("depth {depth} exceeds MAX_PERFT_DEPTH {MAX_PERFT_DEPTH}");
    }
    let mut move_buffers = create_move_buffer_array();

    {
        let moves = &mut move_buffers[0];
        generate_legal(board, moves);
    }

    let move_count = move_buffers[0].len();
    let mut out = Vec::with_capacity(move_count);

    for i in 0..move_count {
        let mv = move_buffers[0][i];
        make_move(board, mv);
        let mut pc = PerftCounters::zero();

        if depth > 1 {
            perft_count_recursive(board, depth - 1, 1, &mut pc, &mut move_buffers);
        } else {
            pc.nodes = 1;
        }

        undo_move(board, mv);
        out.push((mv, pc));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn perft_depth_1_startpos_has_20_moves() {
        let mut board = Board::new();
        assert_eq!(perft(&mut board, 1), 20);
    }

    #[test]
    fn perft_depth_2_startpos() {
        let mut board = Board::new();
        assert_eq!(perft(&mut board, 2), 400);
    }

    #[test]
    fn perft_depth_3_startpos() {
        let mut board = Board::new();
        assert_eq!(perft(&mut board, 3), 8902);
    }

    #[test]
    fn perft_kiwipete_depth_1() {
        let mut board = Board::from_str("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(perft(&mut board, 1), 48);
    }
}
