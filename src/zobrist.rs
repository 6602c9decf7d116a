//! Position fingerprinting (Zobrist hashing).

use crate::types::{Color, Piece};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::LazyLock;

struct ZobristKeys {
    piece_square: [[[u64; 64]; 6]; 2],
    castling: [u64; 16],
    en_passant_file: [u64; 9],
    side_to_move: u64,
}

impl ZobristKeys {
    fn generate() -> ZobristKeys {
        // Fixed seed so fingerprints are reproducible across runs and
        // processes; there is nothing adversarial about this hash.
        let mut rng = StdRng::seed_from_u64(0x2B3C_91A7_F001_D00D);
        let mut piece_square = [[[0u64; 64]; 6]; 2];
        for color in piece_square.iter_mut() {
            for piece in color.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let mut castling = [0u64; 16];
        for key in castling.iter_mut() {
            *key = rng.gen();
        }
        let mut en_passant_file = [0u64; 9];
        for key in en_passant_file.iter_mut() {
            *key = rng.gen();
        }
        ZobristKeys {
            piece_square,
            castling,
            en_passant_file,
            side_to_move: rng.gen(),
        }
    }
}

static KEYS: LazyLock<ZobristKeys> = LazyLock::new(ZobristKeys::generate);

#[inline]
pub fn piece_key(color: Color, piece: Piece, square_index: usize) -> u64 {
    KEYS.piece_square[color.index()][piece.index()][square_index]
}

#[inline]
pub fn castling_key(rights: u8) -> u64 {
    KEYS.castling[rights as usize & 0xF]
}

/// `file` is `None` for "no en-passant target"; the ninth slot.
#[inline]
pub fn en_passant_key(file: Option<u8>) -> u64 {
    match file {
        Some(f) => KEYS.en_passant_file[f as usize],
        None => KEYS.en_passant_file[8],
    }
}

#[inline]
pub fn side_to_move_key() -> u64 {
    KEYS.side_to_move
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_keys_are_distinct_per_square() {
        let a = piece_key(Color::White, Piece::Pawn, 0);
        let b = piece_key(Color::White, Piece::Pawn, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn en_passant_none_differs_from_any_file() {
        let none = en_passant_key(None);
        for file in 0..8 {
            assert_ne!(none, en_passant_key(Some(file)));
        }
    }

    #[test]
    fn keys_are_deterministic_across_calls() {
        assert_eq!(
            piece_key(Color::Black, Piece::Queen, 42),
            piece_key(Color::Black, Piece::Queen, 42)
        );
    }
}
