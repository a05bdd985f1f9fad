//! Transposition table (L5): single-slot, open-addressed by `key mod N`.
//! Entries are replaced when the generation differs (a new root search) or
//! when the incoming depth is at least as deep as what's stored. Mate scores
//! are stored ply-relative (distance from the *current* node) and converted
//! back to root-relative distances on read, since a raw mate score cached at
//! one ply means something different read back at another.

use crate::moves::types::Move;

pub const MATE_THRESHOLD: i32 = 30000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact = 0,
    Lower = 1, // failed high: true score >= stored score
    Upper = 2, // failed low: true score <= stored score
}

impl Bound {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Bound::Exact,
            1 => Bound::Lower,
            _ => Bound::Upper,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TTEntry {
    key: u64,
    best_move: Option<Move>,
    score: i16,
    depth: u8,
    bound: u8,
    generation: u8,
}

const EMPTY: TTEntry = TTEntry {
    key: 0,
    best_move: None,
    score: 0,
    depth: 0,
    bound: 0,
    generation: 0,
};

pub struct ProbeResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u8,
    pub bound: Bound,
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    generation: u8,
}

/// Mate scores are relative to the root by default (`MATE - N` plies from
/// root). Stored relative to `ply` instead, so a hit at a different ply still
/// reports the correct distance to mate from wherever it's read.
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let entry_size = std::mem::size_of::<TTEntry>();
        let num_entries = (size_mb * 1024 * 1024 / entry_size).max(1);

        let mut capacity = 1;
        while capacity * 2 <= num_entries {
            capacity *= 2;
        }

        Self {
            entries: vec![EMPTY; capacity],
            generation: 0,
        }
    }

    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = EMPTY;
        }
        self.generation = 0;
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        (key as usize) & (self.entries.len() - 1)
    }

    pub fn save(&mut self, key: u64, mv: Option<Move>, score: i32, depth: u8, bound: Bound, ply: i32) {
        let idx = self.index(key);
        let entry = &mut self.entries[idx];

        if entry.key != 0 && entry.generation == self.generation && depth < entry.depth {
            return;
        }

        let best_move = if mv.is_some() { mv } else if entry.key == key { entry.best_move } else { None };
        let score_i16 = score_to_tt(score, ply).clamp(-32000, 32000) as i16;

        entry.key = key;
        entry.best_move = best_move;
        entry.score = score_i16;
        entry.depth = depth;
        entry.bound = bound as u8;
        entry.generation = self.generation;
    }

    /// Returns a probe result iff the key matches and the stored depth is at
    /// least the requested depth. Callers still check `bound` against the
    /// live (alpha, beta) window before using `score` for a cutoff.
    pub fn probe(&self, key: u64, depth: u8, ply: i32) -> Option<ProbeResult> {
        let entry = &self.entries[self.index(key)];
        if entry.key != key || entry.depth < depth {
            return None;
        }
        Some(ProbeResult {
            best_move: entry.best_move,
            score: score_from_tt(entry.score as i32, ply),
            depth: entry.depth,
            bound: Bound::from_u8(entry.bound),
        })
    }

    /// Looks up a hash move regardless of stored depth, for move ordering.
    pub fn probe_move(&self, key: u64) -> Option<Move> {
        let entry = &self.entries[self.index(key)];
        if entry.key == key {
            entry.best_move
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Piece;
    use crate::moves::types::MoveKind;
    use crate::square::Square;

    fn mv() -> Move {
        Move::new(Square::from_index(8), Square::from_index(16), Piece::Pawn, MoveKind::Normal, None, None)
    }

    #[test]
    fn probe_requires_sufficient_depth() {
        let mut tt = TranspositionTable::new(1);
        tt.save(42, Some(mv()), 100, 5, Bound::Exact, 0);
        assert!(tt.probe(42, 6, 0).is_none());
        assert!(tt.probe(42, 5, 0).is_some());
    }

    #[test]
    fn mate_score_rebases_across_plies() {
        let mut tt = TranspositionTable::new(1);
        // Mate found 3 plies below the node where it's stored at ply=2.
        tt.save(7, None, MATE_THRESHOLD + 3, 10, Bound::Exact, 2);
        // Read back at a node 5 plies from root: distance-from-here grows.
        let result = tt.probe(7, 1, 5).unwrap();
        assert_eq!(result.score, MATE_THRESHOLD + 3 - 2 + 5);
    }

    #[test]
    fn new_search_replaces_stale_generation_regardless_of_depth() {
        let mut tt = TranspositionTable::new(1);
        tt.save(9, Some(mv()), 50, 10, Bound::Exact, 0);
        tt.new_search();
        tt.save(9, None, 5, 1, Bound::Upper, 0);
        let result = tt.probe(9, 1, 0).unwrap();
        assert_eq!(result.depth, 1);
    }
}
