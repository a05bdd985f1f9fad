//! Precomputed attack tables (L1): ray-from-square tables for the eight
//! directions, non-sliding pawn/knight/king tables, and the 64x64
//! between-squares table. Sliding attacks are computed online with the
//! classical "scan the ray until the first blocker" method, which is the hot
//! path kept deliberately branch-light.

use crate::bitboard::BitboardExt;
use crate::board::Color;
use crate::square::Square;
use once_cell::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// Positive directions scan toward the MSB (bit-scan forward finds the
    /// nearest blocker); negative directions scan toward the LSB (need the
    /// reverse scan, i.e. the highest set bit).
    #[inline(always)]
    const fn is_positive(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::East | Direction::NorthEast | Direction::NorthWest
        )
    }

    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub const BISHOP: [Direction; 4] = [
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub const ROOK: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Whether this direction is a diagonal (bishop-type) step.
    #[inline(always)]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast | Direction::NorthWest | Direction::SouthEast | Direction::SouthWest
        )
    }
}

pub struct AttackTables {
    rays: [[u64; 8]; 64],
    between: Box<[[u64; 64]; 64]>,
    knight: [u64; 64],
    king: [u64; 64],
    pawn: [[u64; 64]; 2],
}

static TABLES: OnceCell<AttackTables> = OnceCell::new();

/// Returns the process-wide attack tables, building them on first use.
pub fn tables() -> &'static AttackTables {
    TABLES.get_or_init(AttackTables::build)
}

fn step(file: i32, rank: i32, dir: Direction) -> Option<(i32, i32)> {
    let (df, dr) = match dir {
        Direction::North => (0, 1),
        Direction::South => (0, -1),
        Direction::East => (1, 0),
        Direction::West => (-1, 0),
        Direction::NorthEast => (1, 1),
        Direction::NorthWest => (-1, 1),
        Direction::SouthEast => (1, -1),
        Direction::SouthWest => (-1, -1),
    };
    let nf = file + df;
    let nr = rank + dr;
    if (0..8).contains(&nf) && (0..8).contains(&nr) {
        Some((nf, nr))
    } else {
        None
    }
}

impl AttackTables {
    fn build() -> AttackTables {
        let mut rays = [[0u64; 8]; 64];
        for sq in 0..64u8 {
            let file = (sq % 8) as i32;
            let rank = (sq / 8) as i32;
            for (i, &dir) in Direction::ALL.iter().enumerate() {
                let mut bb = 0u64;
                let (mut f, mut r) = (file, rank);
                while let Some((nf, nr)) = step(f, r, dir) {
                    bb |= 1u64 << (nr * 8 + nf);
                    f = nf;
                    r = nr;
                }
                rays[sq as usize][i] = bb;
            }
        }

        let mut knight = [0u64; 64];
        let mut king = [0u64; 64];
        let knight_deltas = [
            (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2),
        ];
        let king_deltas = [
            (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1),
        ];
        for sq in 0..64u8 {
            let file = (sq % 8) as i32;
            let rank = (sq / 8) as i32;
            let mut kn = 0u64;
            for &(df, dr) in &knight_deltas {
                let nf = file + df;
                let nr = rank + dr;
                if (0..8).contains(&nf) && (0..8).contains(&nr) {
                    kn |= 1u64 << (nr * 8 + nf);
                }
            }
            knight[sq as usize] = kn;

            let mut ki = 0u64;
            for &(df, dr) in &king_deltas {
                let nf = file + df;
                let nr = rank + dr;
                if (0..8).contains(&nf) && (0..8).contains(&nr) {
                    ki |= 1u64 << (nr * 8 + nf);
                }
            }
            king[sq as usize] = ki;
        }

        let mut pawn = [[0u64; 64]; 2];
        for sq in 0..64u8 {
            let file = (sq % 8) as i32;
            let rank = (sq / 8) as i32;
            for (df, dr) in [(-1, 1), (1, 1)] {
                let nf = file + df;
                let nr = rank + dr;
                if (0..8).contains(&nf) && (0..8).contains(&nr) {
                    pawn[Color::White as usize][sq as usize] |= 1u64 << (nr * 8 + nf);
                }
            }
            for (df, dr) in [(-1, -1), (1, -1)] {
                let nf = file + df;
                let nr = rank + dr;
                if (0..8).contains(&nf) && (0..8).contains(&nr) {
                    pawn[Color::Black as usize][sq as usize] |= 1u64 << (nr * 8 + nf);
                }
            }
        }

        let mut between = Box::new([[0u64; 64]; 64]);
        for a in 0..64u8 {
            for b in 0..64u8 {
                if a == b {
                    continue;
                }
                let af = (a % 8) as i32;
                let ar = (a / 8) as i32;
                let bf = (b % 8) as i32;
                let br = (b / 8) as i32;
                let same_rank = ar == br;
                let same_file = af == bf;
                let same_diag = (af - bf).abs() == (ar - br).abs();
                if !(same_rank || same_file || same_diag) {
                    continue;
                }
                let step_f = (bf - af).signum();
                let step_r = (br - ar).signum();
                let mut bb = 0u64;
                let (mut f, mut r) = (af + step_f, ar + step_r);
                while (f, r) != (bf, br) {
                    bb |= 1u64 << (r * 8 + f);
                    f += step_f;
                    r += step_r;
                }
                between[a as usize][b as usize] = bb;
            }
        }

        AttackTables {
            rays,
            between,
            knight,
            king,
            pawn,
        }
    }

    #[inline(always)]
    pub fn knight_attacks(&self, sq: Square) -> u64 {
        self.knight[sq.index() as usize]
    }

    #[inline(always)]
    pub fn king_attacks(&self, sq: Square) -> u64 {
        self.king[sq.index() as usize]
    }

    #[inline(always)]
    pub fn pawn_attacks(&self, sq: Square, color: Color) -> u64 {
        self.pawn[color as usize][sq.index() as usize]
    }

    #[inline(always)]
    pub fn between(&self, a: Square, b: Square) -> u64 {
        self.between[a.index() as usize][b.index() as usize]
    }

    #[inline(always)]
    fn ray(&self, sq: Square, dir: Direction) -> u64 {
        self.rays[sq.index() as usize][dir as usize]
    }

    /// Classical scan: intersect the ray with blockers, find the nearest one,
    /// mask the ray beyond it.
    #[inline(always)]
    fn scan(&self, sq: Square, dir: Direction, occupied: u64) -> u64 {
        let ray = self.ray(sq, dir);
        let blockers = ray & occupied;
        if blockers == 0 {
            return ray;
        }
        if dir.is_positive() {
            let first = blockers.lsb();
            ray ^ self.ray(Square::from_index(first), dir)
        } else {
            let first = blockers.msb();
            ray ^ self.ray(Square::from_index(first), dir)
        }
    }

    #[inline]
    pub fn bishop_attacks(&self, sq: Square, occupied: u64) -> u64 {
        let mut attacks = 0u64;
        for dir in Direction::BISHOP {
            attacks |= self.scan(sq, dir, occupied);
        }
        attacks
    }

    #[inline]
    pub fn rook_attacks(&self, sq: Square, occupied: u64) -> u64 {
        let mut attacks = 0u64;
        for dir in Direction::ROOK {
            attacks |= self.scan(sq, dir, occupied);
        }
        attacks
    }

    #[inline]
    pub fn queen_attacks(&self, sq: Square, occupied: u64) -> u64 {
        self.bishop_attacks(sq, occupied) | self.rook_attacks(sq, occupied)
    }

    /// Nearest occupied square along `dir` from `sq`, if any. Used for pin
    /// detection, which needs the blocker itself rather than the masked ray
    /// `scan` returns.
    #[inline]
    pub fn first_blocker(&self, sq: Square, dir: Direction, occupied: u64) -> Option<Square> {
        let blockers = self.ray(sq, dir) & occupied;
        if blockers == 0 {
            return None;
        }
        let idx = if dir.is_positive() { blockers.lsb() } else { blockers.msb() };
        Some(Square::from_index(idx))
    }

    #[inline(always)]
    pub fn ray_public(&self, sq: Square, dir: Direction) -> u64 {
        self.ray(sq, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_attacks_d4_no_blockers() {
        let t = tables();
        let attacks = t.rook_attacks(Square::from_index(27), 0);
        // full rank 4 and file d minus origin = 14 squares
        assert_eq!(attacks.count_ones(), 14);
    }

    #[test]
    fn rook_attacks_d4_with_blockers_stop_at_first() {
        let t = tables();
        let occ = Square::try_from("d6").unwrap().bit() | Square::try_from("d3").unwrap().bit();
        let attacks = t.rook_attacks(Square::from_index(27), occ);
        assert!(attacks & Square::try_from("d6").unwrap().bit() != 0);
        assert!(attacks & Square::try_from("d7").unwrap().bit() == 0);
        assert!(attacks & Square::try_from("d3").unwrap().bit() != 0);
        assert!(attacks & Square::try_from("d2").unwrap().bit() == 0);
    }

    #[test]
    fn bishop_attacks_d4_no_blockers() {
        let t = tables();
        let attacks = t.bishop_attacks(Square::from_index(27), 0);
        assert_eq!(attacks.count_ones(), 13);
    }

    #[test]
    fn between_squares_same_rank() {
        let t = tables();
        let a1 = Square::try_from("a1").unwrap();
        let d1 = Square::try_from("d1").unwrap();
        let b = t.between(a1, d1);
        assert_eq!(b.count_ones(), 2);
        assert!(b & Square::try_from("b1").unwrap().bit() != 0);
        assert!(b & Square::try_from("c1").unwrap().bit() != 0);
    }

    #[test]
    fn between_unrelated_squares_is_empty() {
        let t = tables();
        let a1 = Square::try_from("a1").unwrap();
        let b3 = Square::try_from("b3").unwrap();
        assert_eq!(t.between(a1, b3), 0);
    }
}
