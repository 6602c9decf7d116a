//! Built-in sacrifice-pattern scoring: a small table of hand-written rules
//! over material counts, rewarding material-down positions that retain
//! attacking potential. Unlike the original collaborator this never loads
//! pattern files from disk; the patterns below are fixed at compile time.

use crate::board::Position;
use crate::types::{Color, Piece};

#[derive(Clone, Copy, Debug, Default)]
struct MaterialCount {
    queens: i32,
    rooks: i32,
    minors: i32,
    pawns: i32,
}

impl MaterialCount {
    fn total(self) -> i32 {
        self.queens * 9 + self.rooks * 5 + self.minors * 3 + self.pawns
    }
}

fn count_material(pos: &Position, color: Color) -> MaterialCount {
    MaterialCount {
        queens: pos.pieces(color, Piece::Queen).count_ones() as i32,
        rooks: pos.pieces(color, Piece::Rook).count_ones() as i32,
        minors: (pos.pieces(color, Piece::Bishop) | pos.pieces(color, Piece::Knight)).count_ones()
            as i32,
        pawns: pos.pieces(color, Piece::Pawn).count_ones() as i32,
    }
}

struct Pattern {
    /// Minimum material deficit (us below them) that still qualifies.
    min_deficit: i32,
    max_deficit: i32,
    bonus: i32,
}

/// Rewards being materially down by an exchange-to-minor-piece range while
/// still holding the queen, a rough proxy for "the sacrifice bought an
/// attack" without simulating the attack itself.
const PATTERNS: &[Pattern] = &[
    Pattern { min_deficit: 1, max_deficit: 3, bonus: 10 },
    Pattern { min_deficit: 4, max_deficit: 5, bonus: 18 },
];

fn has_attacking_queen(count: MaterialCount) -> bool {
    count.queens > 0 && (count.rooks > 0 || count.minors > 0)
}

/// Side-to-move relative addend, scaled by `weight` (0 disables it).
pub fn score(pos: &Position, weight: i32) -> i32 {
    if weight == 0 {
        return 0;
    }
    let us = pos.side_to_move();
    let them = us.opposite();
    let our_material = count_material(pos, us);
    let their_material = count_material(pos, them);
    let deficit = their_material.total() - our_material.total();

    if deficit <= 0 || !has_attacking_queen(our_material) {
        return 0;
    }

    let bonus = PATTERNS
        .iter()
        .find(|p| deficit >= p.min_deficit && deficit <= p.max_deficit)
        .map(|p| p.bonus)
        .unwrap_or(0);

    bonus * weight / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_disables_the_addend() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - -");
        assert_eq!(score(&pos, 0), 0);
    }

    #[test]
    fn material_advantage_scores_nothing() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 w - -");
        assert_eq!(score(&pos, 100), 0);
    }
}
