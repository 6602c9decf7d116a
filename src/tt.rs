//! Lockless, depth-preferred transposition table.
//!
//! Each slot is two independent 64-bit atomics: a key and a data word.
//! Writers publish the data word with relaxed ordering, then the key word
//! with release ordering. Readers load the key with acquire ordering, then
//! the data word with relaxed ordering, and treat a key mismatch as a
//! miss. A torn read (writer interleaved with reader) always manifests as
//! a key mismatch, never a mismatched decode, because the key and data are
//! never combined into one word.

use crate::types::{BoundType, Move, Piece, Square};
use std::sync::atomic::{AtomicU64, Ordering};

const BOUND_EMPTY: u64 = 3;
const NO_MOVE: u16 = 0;
const HAS_MOVE_BIT: u16 = 1 << 15;

fn pack_move(m: Option<Move>) -> u16 {
    match m {
        None => NO_MOVE,
        Some(mv) => {
            let promo_code: u16 = match mv.promotion {
                None => 0,
                Some(Piece::Queen) => 1,
                Some(Piece::Rook) => 2,
                Some(Piece::Bishop) => 3,
                Some(Piece::Knight) => 4,
                Some(_) => 0,
            };
            HAS_MOVE_BIT
                | ((mv.from.index() as u16) << 9)
                | ((mv.to.index() as u16) << 3)
                | promo_code
        }
    }
}

fn unpack_move(bits: u16) -> Option<Move> {
    if bits & HAS_MOVE_BIT == 0 {
        return None;
    }
    let from = Square(((bits >> 9) & 0x3F) as u8);
    let to = Square(((bits >> 3) & 0x3F) as u8);
    let promotion = match bits & 0x7 {
        1 => Some(Piece::Queen),
        2 => Some(Piece::Rook),
        3 => Some(Piece::Bishop),
        4 => Some(Piece::Knight),
        _ => None,
    };
    Some(Move {
        from,
        to,
        promotion,
        captured: None,
        is_en_passant: false,
        is_castling: false,
    })
}

fn pack_data(score: i32, depth: u8, bound: BoundType) -> u64 {
    let score_bits = (score as u32) as u64;
    let depth_bits = depth as u64;
    let bound_bits = bound.to_bits() as u64;
    score_bits | (depth_bits << 32) | (bound_bits << 40)
}

fn pack_data_with_move(score: i32, depth: u8, bound: BoundType, mv: Option<Move>) -> u64 {
    pack_data(score, depth, bound) | ((pack_move(mv) as u64) << 42)
}

fn empty_data() -> u64 {
    BOUND_EMPTY << 40
}

#[derive(Clone, Copy, Debug)]
pub struct TTEntry {
    pub score: i32,
    pub depth: u8,
    pub bound: BoundType,
    pub best_move: Option<Move>,
}

fn unpack_data(data: u64) -> Option<TTEntry> {
    let bound_bits = (data >> 40) & 0x3;
    if bound_bits == BOUND_EMPTY {
        return None;
    }
    let score = (data & 0xFFFF_FFFF) as u32 as i32;
    let depth = ((data >> 32) & 0xFF) as u8;
    let bound = BoundType::from_bits(bound_bits as u8);
    let best_move = unpack_move(((data >> 42) & 0xFFFF) as u16);
    Some(TTEntry {
        score,
        depth,
        bound,
        best_move,
    })
}

struct Slot {
    key: AtomicU64,
    data: AtomicU64,
}

pub struct TranspositionTable {
    slots: Vec<Slot>,
    mask: u64,
}

const SLOT_BYTES: usize = 16;

impl TranspositionTable {
    pub fn new(size_mb: usize) -> TranspositionTable {
        Self::try_new(size_mb).unwrap_or_else(|| {
            Self::try_new(1).expect("a 1 MiB transposition table should always fit")
        })
    }

    /// Fallible constructor: returns `None` instead of aborting the process
    /// if `size_mb` can't be allocated, so a caller resizing the table (e.g.
    /// `setoption name Hash`) can fall back to keeping the table it already
    /// has.
    pub fn try_new(size_mb: usize) -> Option<TranspositionTable> {
        let budget_bytes = size_mb.max(1) * 1024 * 1024;
        let mut capacity = (budget_bytes / SLOT_BYTES).next_power_of_two();
        if capacity * SLOT_BYTES > budget_bytes && capacity > 1 {
            capacity /= 2;
        }
        capacity = capacity.max(1);

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).ok()?;
        slots.extend((0..capacity).map(|_| Slot {
            key: AtomicU64::new(0),
            data: AtomicU64::new(empty_data()),
        }));
        Some(TranspositionTable {
            slots,
            mask: (capacity - 1) as u64,
        })
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }

    pub fn probe(&self, key: u64) -> Option<TTEntry> {
        let slot = &self.slots[self.index(key)];
        let stored_key = slot.key.load(Ordering::Acquire);
        if stored_key != key {
            return None;
        }
        let data = slot.data.load(Ordering::Relaxed);
        unpack_data(data)
    }

    pub fn store(&self, key: u64, depth: u8, score: i32, bound: BoundType, best_move: Option<Move>) {
        let slot = &self.slots[self.index(key)];
        let existing_key = slot.key.load(Ordering::Relaxed);
        if existing_key == key {
            let existing_data = slot.data.load(Ordering::Relaxed);
            if let Some(existing) = unpack_data(existing_data) {
                if existing.depth > depth {
                    return;
                }
            }
        }
        let data = pack_data_with_move(score, depth, bound, best_move);
        slot.data.store(data, Ordering::Relaxed);
        slot.key.store(key, Ordering::Release);
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            slot.data.store(empty_data(), Ordering::Relaxed);
            slot.key.store(0, Ordering::Release);
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Approximate per-mille occupancy, sampled (not exhaustive, matching
    /// how engines report `hashfull` without scanning the whole table).
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample = self.slots.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let occupied = self.slots[..sample]
            .iter()
            .filter(|s| s.key.load(Ordering::Relaxed) != 0)
            .count();
        (occupied * 1000 / sample) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_on_empty_table_misses() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(12345).is_none());
    }

    #[test]
    fn store_then_probe_round_trips() {
        let tt = TranspositionTable::new(1);
        let mv = Move {
            from: Square::new(1, 4),
            to: Square::new(3, 4),
            promotion: None,
            captured: None,
            is_en_passant: false,
            is_castling: false,
        };
        tt.store(999, 6, 42, BoundType::Exact, Some(mv));
        let entry = tt.probe(999).expect("entry present");
        assert_eq!(entry.score, 42);
        assert_eq!(entry.depth, 6);
        assert_eq!(entry.bound, BoundType::Exact);
        assert_eq!(entry.best_move, Some(mv));
    }

    #[test]
    fn shallower_store_does_not_overwrite_deeper_entry() {
        let tt = TranspositionTable::new(1);
        tt.store(7, 10, 100, BoundType::Exact, None);
        tt.store(7, 3, 1, BoundType::Exact, None);
        assert_eq!(tt.probe(7).unwrap().depth, 10);
    }

    #[test]
    fn different_key_at_same_index_always_overwrites() {
        let tt = TranspositionTable::new(1);
        let capacity = tt.capacity() as u64;
        tt.store(5, 10, 1, BoundType::Exact, None);
        tt.store(5 + capacity, 1, 2, BoundType::Exact, None);
        assert_eq!(tt.probe(5 + capacity).unwrap().score, 2);
        assert!(tt.probe(5).is_none());
    }

    #[test]
    fn negative_scores_round_trip() {
        let tt = TranspositionTable::new(1);
        tt.store(42, 4, -500, BoundType::Upper, None);
        assert_eq!(tt.probe(42).unwrap().score, -500);
    }
}
