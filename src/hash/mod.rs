//! Zobrist hashing (L2): incremental position and pawn-only keys.

pub mod zobrist;
