//! Magic-multiplication lookup tables for sliding-piece attacks.
//!
//! For each square we store a relevance mask, a magic multiplier, a shift,
//! and an offset into a flat attack table. The multipliers are found at
//! process start by trying sparse random 64-bit candidates until one maps
//! every occupancy subset of the mask to a unique table slot.

use crate::bitboard::Bitboard;
use crate::types::Square;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::LazyLock;

const ROOK_DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

fn slider_mask(sq: usize, dirs: [(i32, i32); 4]) -> Bitboard {
    let rank = (sq / 8) as i32;
    let file = (sq % 8) as i32;
    let mut mask = 0u64;
    for (dr, df) in dirs {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let next_r = r + dr;
            let next_f = f + df;
            if !(0..8).contains(&next_r) || !(0..8).contains(&next_f) {
                break;
            }
            mask |= 1u64 << (r * 8 + f);
            r = next_r;
            f = next_f;
        }
    }
    mask
}

fn slider_attacks(sq: usize, dirs: [(i32, i32); 4], occupancy: Bitboard) -> Bitboard {
    let rank = (sq / 8) as i32;
    let file = (sq % 8) as i32;
    let mut attacks = 0u64;
    for (dr, df) in dirs {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let bit = 1u64 << (r * 8 + f);
            attacks |= bit;
            if occupancy & bit != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }
    attacks
}

/// Enumerate every occupancy subset of `mask` (standard "Carry-Rippler" walk).
fn subsets(mask: Bitboard) -> Vec<Bitboard> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset: Bitboard = 0;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

struct MagicEntry {
    mask: Bitboard,
    magic: u64,
    shift: u32,
    offset: usize,
}

struct SlidingTable {
    entries: [MagicEntry; 64],
    attacks: Vec<Bitboard>,
}

/// Search for a sparse-random multiplier that perfectly hashes every
/// occupancy subset of `mask` into `table_size` slots with no collision
/// between distinct attack sets.
fn find_magic(sq: usize, mask: Bitboard, dirs: [(i32, i32); 4], rng: &mut StdRng) -> (u64, Vec<Bitboard>) {
    let bits = mask.count_ones();
    let shift = 64 - bits;
    let table_size = 1usize << bits;
    let occupancies = subsets(mask);
    let reference: Vec<Bitboard> = occupancies
        .iter()
        .map(|&occ| slider_attacks(sq, dirs, occ))
        .collect();

    loop {
        let candidate: u64 = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
        if (candidate.wrapping_mul(mask)) >> 56 < 6 {
            continue;
        }
        let mut table = vec![None; table_size];
        let mut ok = true;
        for (occ, &attack) in occupancies.iter().zip(reference.iter()) {
            let idx = ((occ.wrapping_mul(candidate)) >> shift) as usize;
            match table[idx] {
                None => table[idx] = Some(attack),
                Some(existing) if existing == attack => {}
                Some(_) => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return (candidate, table.into_iter().map(|v| v.unwrap_or(0)).collect());
        }
    }
}

fn build_table(dirs: [(i32, i32); 4]) -> SlidingTable {
    // Fixed seed: attack tables must be identical across runs and threads,
    // and magic search is deterministic given the same seed.
    let mut rng = StdRng::seed_from_u64(0x5EED_0000_C0FF_EE01);
    let mut attacks: Vec<Bitboard> = Vec::new();
    let entries: Vec<MagicEntry> = (0..64)
        .map(|sq| {
            let mask = slider_mask(sq, dirs);
            let (magic, table) = find_magic(sq, mask, dirs, &mut rng);
            let offset = attacks.len();
            attacks.extend_from_slice(&table);
            MagicEntry {
                mask,
                magic,
                shift: 64 - mask.count_ones(),
                offset,
            }
        })
        .collect();
    let entries: [MagicEntry; 64] = entries.try_into().unwrap_or_else(|_| unreachable!());
    SlidingTable { entries, attacks }
}

static ROOK_TABLE: LazyLock<SlidingTable> = LazyLock::new(|| build_table(ROOK_DIRS));
static BISHOP_TABLE: LazyLock<SlidingTable> = LazyLock::new(|| build_table(BISHOP_DIRS));

#[inline]
fn lookup(table: &SlidingTable, sq: usize, occupancy: Bitboard) -> Bitboard {
    let entry = &table.entries[sq];
    let blockers = occupancy & entry.mask;
    let idx = (blockers.wrapping_mul(entry.magic)) >> entry.shift;
    table.attacks[entry.offset + idx as usize]
}

pub fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    lookup(&ROOK_TABLE, sq.index(), occupancy)
}

pub fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    lookup(&BISHOP_TABLE, sq.index(), occupancy)
}

pub fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    rook_attacks(sq, occupancy) | bishop_attacks(sq, occupancy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_on_empty_board_sweeps_rank_and_file() {
        let attacks = rook_attacks(Square::new(3, 3), 0);
        // 14 squares: 7 on the rank, 7 on the file.
        assert_eq!(attacks.count_ones(), 14);
    }

    #[test]
    fn rook_attack_stops_at_first_blocker() {
        let blocker = Square::new(3, 5);
        let occ = 1u64 << blocker.index();
        let attacks = rook_attacks(Square::new(3, 3), occ);
        assert!(attacks & (1u64 << blocker.index()) != 0);
        assert!(attacks & (1u64 << Square::new(3, 6).index()) == 0);
    }

    #[test]
    fn bishop_on_corner_has_seven_attacks_on_empty_board() {
        let attacks = bishop_attacks(Square::new(0, 0), 0);
        assert_eq!(attacks.count_ones(), 7);
    }

    #[test]
    fn queen_attacks_union_rook_and_bishop() {
        let sq = Square::new(4, 4);
        let occ = 0;
        assert_eq!(
            queen_attacks(sq, occ),
            rook_attacks(sq, occ) | bishop_attacks(sq, occ)
        );
    }
}
