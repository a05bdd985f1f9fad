//! Incremental Zobrist hashing (L2): one 64-bit key for the full position and
//! a second covering only the pawn subset, so pawn-structure evaluation can
//! be cached independently of everything else on the board.

use crate::bitboard::{FILE_A, FILE_H};
use crate::board::castle_bits::{CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ};
use crate::board::{Board, Color, Piece};
use crate::square::Square;
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

#[cfg(feature = "deterministic_zobrist")]
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

pub struct ZobristKeys {
    /// [color][piece][square], color = {White=0, Black=1}, piece = {P,N,B,R,Q,K}
    piece: [[[u64; 64]; 6]; 2],
    side: u64,
    /// bit order K, Q, k, q
    castling: [u64; 4],
    ep_file: [u64; 8],
}

fn make_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        StdRng::from_os_rng()
    }
}

fn next_nonzero(rng: &mut StdRng) -> u64 {
    loop {
        let v = rng.next_u64();
        if v != 0 {
            return v;
        }
    }
}

fn generate_zobrist_keys_with_rng(mut rng: StdRng) -> ZobristKeys {
    let mut piece = [[[0u64; 64]; 6]; 2];
    for c in piece.iter_mut() {
        for p in c.iter_mut() {
            for sq in p.iter_mut() {
                *sq = next_nonzero(&mut rng);
            }
        }
    }
    let mut castling = [0u64; 4];
    for c in castling.iter_mut() {
        *c = next_nonzero(&mut rng);
    }
    let mut ep_file = [0u64; 8];
    for f in ep_file.iter_mut() {
        *f = next_nonzero(&mut rng);
    }
    ZobristKeys {
        piece,
        side: next_nonzero(&mut rng),
        castling,
        ep_file,
    }
}

pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_zobrist_keys_with_rng(make_rng()))
}

impl ZobristKeys {
    #[inline]
    pub fn piece(&self, color: Color, piece: Piece, sq: Square) -> u64 {
        self.piece[color as usize][piece as usize][sq.index() as usize]
    }

    #[inline]
    pub fn side(&self) -> u64 {
        self.side
    }

    #[inline]
    pub fn ep_file(&self, file: u8) -> u64 {
        self.ep_file[file as usize]
    }
}

/// XOR-delta to transition castling rights from `old` to `new`, one key per
/// bit that actually flipped.
#[inline]
pub fn xor_castling_rights_delta(hash: &mut u64, keys: &ZobristKeys, old: u8, new: u8) {
    let changed = old ^ new;
    if changed & CASTLE_WK != 0 {
        *hash ^= keys.castling[0];
    }
    if changed & CASTLE_WQ != 0 {
        *hash ^= keys.castling[1];
    }
    if changed & CASTLE_BK != 0 {
        *hash ^= keys.castling[2];
    }
    if changed & CASTLE_BQ != 0 {
        *hash ^= keys.castling[3];
    }
}

/// Relaxed en-passant hashing rule: only mix the EP file into the key when a
/// pawn of the side to move could actually capture onto that square.
/// Positions that differ only by a capture-irrelevant EP flag then share a
/// key, which is sound because EP availability never otherwise affects legal
/// moves from any other square.
pub fn ep_file_to_hash(board: &Board) -> Option<u8> {
    let ep = board.en_passant?;
    let s = ep.index();
    let rank = s / 8;
    if rank != 2 && rank != 5 {
        return None;
    }
    let bb_s: u64 = 1u64 << s;

    let has_capturing_pawn = match board.side_to_move {
        Color::White => {
            let src_ne = (bb_s >> 9) & !FILE_H;
            let src_nw = (bb_s >> 7) & !FILE_A;
            (src_ne | src_nw) & board.bb(Color::White, Piece::Pawn) != 0
        }
        Color::Black => {
            let src_se = (bb_s << 7) & !FILE_A;
            let src_sw = (bb_s << 9) & !FILE_H;
            (src_se | src_sw) & board.bb(Color::Black, Piece::Pawn) != 0
        }
    };

    has_capturing_pawn.then_some(s % 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_across_calls() {
        let a = zobrist_keys().piece(Color::White, Piece::Pawn, Square::from_index(8));
        let b = zobrist_keys().piece(Color::White, Piece::Pawn, Square::from_index(8));
        assert_eq!(a, b);
    }

    #[test]
    fn castling_delta_round_trips() {
        let keys = zobrist_keys();
        let mut h = 0u64;
        xor_castling_rights_delta(&mut h, keys, 0b1111, 0b1101);
        xor_castling_rights_delta(&mut h, keys, 0b1101, 0b1111);
        assert_eq!(h, 0);
    }
}
