//! NNUE evaluator: a four-layer network over half-king-bucket features,
//! maintained incrementally from make/undo rather than rebuilt each node.
//!
//! Grounded on the reference engine's `NNUE` class: the feature indexing
//! (`640*bucket + 64*piece_index + square`, computed once per perspective),
//! the king-bucket table, and the accumulator snapshot-by-ply scheme used to
//! make undo a copy instead of a recompute.

use crate::board::{Board, Color, Piece, MAX_PLIES};
use crate::bitboard::BitboardExt;
use crate::error::MissingResource;
use crate::eval::{self, Evaluator};
use crate::square::Square;
use std::fs;
use std::path::Path;

pub const ACC_SIZE: usize = 128;
const KING_BUCKETS: usize = 32;
const PIECE_SLOTS: usize = 10; // 5 non-king kinds x own/enemy
const FEATURES: usize = KING_BUCKETS * 64 * PIECE_SLOTS;
const L2_IN: usize = ACC_SIZE * 2;
const L2_OUT: usize = 32;
const L3_OUT: usize = 32;

#[rustfmt::skip]
const KING_BUCKET_TABLE: [u8; 64] = [
     0,  1,  2,  3,  4,  5,  6,  7,
     8,  9, 10, 11, 12, 13, 14, 15,
    16, 16, 17, 17, 18, 18, 19, 19,
    20, 20, 21, 21, 22, 22, 23, 23,
    24, 24, 25, 25, 26, 26, 27, 27,
    24, 24, 25, 25, 26, 26, 27, 27,
    28, 28, 29, 29, 30, 30, 31, 31,
    28, 28, 29, 29, 30, 30, 31, 31,
];

struct Network {
    w1: Vec<f32>, // FEATURES * ACC_SIZE
    b1: [f32; ACC_SIZE],
    w2: Vec<f32>, // L2_OUT * L2_IN
    b2: [f32; L2_OUT],
    w3: Vec<f32>, // L3_OUT * L2_OUT
    b3: [f32; L3_OUT],
    w4: Vec<f32>, // 1 * L3_OUT
    b4: [f32; 1],
}

const CONVERSION_FACTOR: f32 = 32767.0 / 3.0;

impl Network {
    fn load(path: &Path) -> Result<Network, MissingResource> {
        let bytes = fs::read(path).map_err(|e| MissingResource {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let w1_len = FEATURES * ACC_SIZE;
        let w2_len = L2_OUT * L2_IN;
        let w3_len = L3_OUT * L2_OUT;
        let w4_len = L3_OUT;

        let expected_bytes = w1_len * 2 // w1 stored as i16, scaled on load
            + ACC_SIZE * 4
            + w2_len * 4
            + L2_OUT * 4
            + w3_len * 4
            + L3_OUT * 4
            + w4_len * 4
            + 4;

        if bytes.len() < expected_bytes {
            return Err(MissingResource {
                path: path.display().to_string(),
                reason: format!(
                    "file too short: expected at least {expected_bytes} bytes, got {}",
                    bytes.len()
                ),
            });
        }

        let mut cursor = 0usize;
        let mut w1_raw = Vec::with_capacity(w1_len);
        for _ in 0..w1_len {
            w1_raw.push(i16::from_le_bytes([bytes[cursor], bytes[cursor + 1]]));
            cursor += 2;
        }
        let w1 = w1_raw.into_iter().map(|v| v as f32 / CONVERSION_FACTOR).collect();

        let mut read_f32_vec = |n: usize, cursor: &mut usize| -> Vec<f32> {
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                out.push(f32::from_le_bytes([
                    bytes[*cursor],
                    bytes[*cursor + 1],
                    bytes[*cursor + 2],
                    bytes[*cursor + 3],
                ]));
                *cursor += 4;
            }
            out
        };

        let b1 = read_f32_vec(ACC_SIZE, &mut cursor);
        let w2 = read_f32_vec(w2_len, &mut cursor);
        let b2 = read_f32_vec(L2_OUT, &mut cursor);
        let w3 = read_f32_vec(w3_len, &mut cursor);
        let b3 = read_f32_vec(L3_OUT, &mut cursor);
        let w4 = read_f32_vec(w4_len, &mut cursor);
        let b4 = read_f32_vec(1, &mut cursor);

        Ok(Network {
            w1,
            b1: b1.try_into().unwrap(),
            w2,
            b2: b2.try_into().unwrap(),
            w3,
            b3: b3.try_into().unwrap(),
            w4,
            b4: b4.try_into().unwrap(),
        })
    }
}

#[inline(always)]
fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

fn dense_layer(input: &[f32], weights: &[f32], biases: &[f32], dim_in: usize, dim_out: usize, relu: bool, out: &mut [f32]) {
    for o in 0..dim_out {
        let row = &weights[o * dim_in..(o + 1) * dim_in];
        let mut sum = biases[o];
        for (w, x) in row.iter().zip(input.iter()) {
            sum += w * x;
        }
        out[o] = if relu { clamp01(sum) } else { sum };
    }
}

/// Own/enemy-relative piece index into the 10-slot feature bank: kinds 0..4
/// are Pawn..Queen (King is never indexed, it only selects the bucket).
fn piece_index(piece: Piece, owned_by_perspective: bool) -> usize {
    let kind = piece as usize;
    kind * 2 + usize::from(!owned_by_perspective)
}

fn feature_index(king_bucket: u8, index: usize, square: usize) -> usize {
    640 * king_bucket as usize + 64 * index + square
}

fn king_bucket_for(board: &Board, perspective: Color) -> u8 {
    let king_sq = board.king_square(perspective).index();
    let oriented = if perspective == Color::White { king_sq } else { king_sq ^ 56 };
    KING_BUCKET_TABLE[oriented as usize]
}

fn apply_feature_perspective(net: &Network, acc: &mut [f32; ACC_SIZE], bucket: u8, index: usize, square: usize, sign: f32) {
    let feat = feature_index(bucket, index, square);
    let col = &net.w1[feat * ACC_SIZE..(feat + 1) * ACC_SIZE];
    for i in 0..ACC_SIZE {
        acc[i] += sign * col[i];
    }
}

fn apply_feature(net: &Network, acc: &mut [[f32; ACC_SIZE]; 2], board: &Board, color: Color, piece: Piece, sq: Square, sign: f32) {
    for &perspective in &[Color::White, Color::Black] {
        let bucket = king_bucket_for(board, perspective);
        let index = piece_index(piece, color == perspective);
        let oriented_sq = if perspective == Color::White { sq.index() } else { sq.index() ^ 56 };
        apply_feature_perspective(net, &mut acc[perspective as usize], bucket, index, oriented_sq as usize, sign);
    }
}

/// Per-ply accumulator snapshot, mirroring the board's ring-buffer undo
/// history so restoring on undo is a copy rather than a rebuild.
pub struct NnueEvaluator {
    net: Option<Network>,
    accumulator: [[f32; ACC_SIZE]; 2],
    history: Box<[[[f32; ACC_SIZE]; 2]]>,
}

impl NnueEvaluator {
    pub fn new() -> Self {
        Self {
            net: None,
            accumulator: [[0.0; ACC_SIZE]; 2],
            history: vec![[[0.0; ACC_SIZE]; 2]; MAX_PLIES].into_boxed_slice(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.net.is_some()
    }

    /// Loads a network file; on failure the caller falls back to the
    /// classical evaluator per the orchestrator's resource-loading policy.
    pub fn load(&mut self, path: &Path) -> Result<(), MissingResource> {
        let net = Network::load(path)?;
        self.net = Some(net);
        Ok(())
    }

    pub fn refresh(&mut self, board: &Board) {
        self.refresh_perspective(board, Color::White);
        self.refresh_perspective(board, Color::Black);
    }

    fn refresh_perspective(&mut self, board: &Board, perspective: Color) {
        let Some(net) = &self.net else { return };
        let idx = perspective as usize;
        self.accumulator[idx] = net.b1;
        let bucket = king_bucket_for(board, perspective);

        for &color in &[Color::White, Color::Black] {
            for piece in [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
                let index = piece_index(piece, color == perspective);
                for sq in board.pieces(piece, color).squares() {
                    let oriented_sq = if perspective == Color::White { sq.index() } else { sq.index() ^ 56 };
                    apply_feature_perspective(net, &mut self.accumulator[idx], bucket, index, oriented_sq as usize, 1.0);
                }
            }
        }
    }
}

impl Default for NnueEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for NnueEvaluator {
    fn static_eval(&mut self, board: &Board) -> i32 {
        if eval::is_trivially_drawn(board) {
            return 0;
        }

        let Some(net) = &self.net else {
            return 0;
        };

        let stm = board.side_to_move as usize;
        let ntm = 1 - stm;

        let mut input = [0f32; L2_IN];
        for i in 0..ACC_SIZE {
            input[i] = clamp01(self.accumulator[stm][i]);
            input[ACC_SIZE + i] = clamp01(self.accumulator[ntm][i]);
        }

        let mut l2 = [0f32; L2_OUT];
        dense_layer(&input, &net.w2, &net.b2, L2_IN, L2_OUT, true, &mut l2);
        let mut l3 = [0f32; L3_OUT];
        dense_layer(&l2, &net.w3, &net.b3, L2_OUT, L3_OUT, true, &mut l3);
        let mut l4 = [0f32; 1];
        dense_layer(&l3, &net.w4, &net.b4, L3_OUT, 1, false, &mut l4);

        (l4[0] * 100.0) as i32
    }

    fn add_piece(&mut self, board: &Board, color: Color, piece: Piece, sq: Square) {
        if piece == Piece::King {
            return;
        }
        if let Some(net) = self.net.take() {
            apply_feature(&net, &mut self.accumulator, board, color, piece, sq, 1.0);
            self.net = Some(net);
        }
    }

    fn remove_piece(&mut self, board: &Board, color: Color, piece: Piece, sq: Square) {
        if piece == Piece::King {
            return;
        }
        if let Some(net) = self.net.take() {
            apply_feature(&net, &mut self.accumulator, board, color, piece, sq, -1.0);
            self.net = Some(net);
        }
    }

    fn move_piece(&mut self, board: &Board, color: Color, piece: Piece, from: Square, to: Square) {
        if piece != Piece::King {
            self.remove_piece(board, color, piece, from);
            self.add_piece(board, color, piece, to);
            return;
        }
        let oriented_from = if color == Color::White { from.index() } else { from.index() ^ 56 };
        let oriented_to = if color == Color::White { to.index() } else { to.index() ^ 56 };
        if KING_BUCKET_TABLE[oriented_from as usize] != KING_BUCKET_TABLE[oriented_to as usize] {
            self.refresh_perspective(board, color);
        }
    }

    fn snapshot(&mut self, ply: usize) {
        debug_assert!(ply < MAX_PLIES);
        self.history[ply] = self.accumulator;
    }

    fn restore(&mut self, ply: usize) {
        debug_assert!(ply < MAX_PLIES);
        self.accumulator = self.history[ply];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_network_evaluates_to_zero() {
        let mut nnue = NnueEvaluator::new();
        let board = Board::new();
        assert!(!nnue.is_loaded());
        assert_eq!(nnue.static_eval(&board), 0);
    }

    #[test]
    fn missing_file_reports_missing_resource() {
        let mut nnue = NnueEvaluator::new();
        let err = nnue.load(Path::new("/nonexistent/path/to/net.nnue")).unwrap_err();
        assert!(!err.path.is_empty());
    }
}
