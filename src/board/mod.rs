//! Position representation and make/unmake. Bitboards are canonical; there
//! is no parallel mailbox encoding.

pub mod fen;
pub mod movegen;
pub mod see;

use crate::bitboard::{self, Bitboard};
use crate::magic;
use crate::types::{
    BoundType, Color, Move, NullInfo, Piece, Square, UnmakeInfo, ALL_CASTLING_RIGHTS,
    BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE, WHITE_QUEENSIDE,
};
use crate::zobrist;

pub use fen::FenError;

#[derive(Clone, Debug)]
pub struct Position {
    pieces: [[Bitboard; 6]; 2],
    occ: [Bitboard; 2],
    occ_all: Bitboard,
    side_to_move: Color,
    castling_rights: u8,
    en_passant_file: Option<u8>,
    king_square: [Square; 2],
    hash: u64,
}

const WHITE_KING_HOME: Square = Square(4);
const WHITE_ROOK_A_HOME: Square = Square(0);
const WHITE_ROOK_H_HOME: Square = Square(7);
const BLACK_KING_HOME: Square = Square(60);
const BLACK_ROOK_A_HOME: Square = Square(56);
const BLACK_ROOK_H_HOME: Square = Square(63);

impl Position {
    pub fn startpos() -> Position {
        // Parsed from the FEN rather than hand-packed hex constants: one
        // source of truth for the initial arrangement.
        Position::from_fen(crate::constants::STARTPOS_FEN)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn castling_rights(&self) -> u8 {
        self.castling_rights
    }

    #[inline]
    pub fn en_passant_file(&self) -> Option<u8> {
        self.en_passant_file
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_square[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.occ_all
    }

    #[inline]
    pub fn occupied_by(&self, color: Color) -> Bitboard {
        self.occ[color.index()]
    }

    #[inline]
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    #[inline]
    pub fn all_pieces_of(&self, piece: Piece) -> Bitboard {
        self.pieces[0][piece.index()] | self.pieces[1][piece.index()]
    }

    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        let bit = bitboard::sq_bb(sq);
        if self.occ_all & bit == 0 {
            return None;
        }
        let color = if self.occ[Color::White.index()] & bit != 0 {
            Color::White
        } else {
            Color::Black
        };
        for piece in crate::types::PIECES {
            if self.pieces[color.index()][piece.index()] & bit != 0 {
                return Some((color, piece));
            }
        }
        None
    }

    fn put_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = bitboard::sq_bb(sq);
        self.pieces[color.index()][piece.index()] |= bit;
        self.occ[color.index()] |= bit;
        self.occ_all |= bit;
        self.hash ^= zobrist::piece_key(color, piece, sq.index());
        if piece == Piece::King {
            self.king_square[color.index()] = sq;
        }
    }

    fn remove_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = bitboard::sq_bb(sq);
        self.pieces[color.index()][piece.index()] &= !bit;
        self.occ[color.index()] &= !bit;
        self.occ_all &= !bit;
        self.hash ^= zobrist::piece_key(color, piece, sq.index());
    }

    fn set_castling_rights(&mut self, rights: u8) {
        self.hash ^= zobrist::castling_key(self.castling_rights);
        self.castling_rights = rights;
        self.hash ^= zobrist::castling_key(self.castling_rights);
    }

    fn set_en_passant_file(&mut self, file: Option<u8>) {
        self.hash ^= zobrist::en_passant_key(self.en_passant_file);
        self.en_passant_file = file;
        self.hash ^= zobrist::en_passant_key(self.en_passant_file);
    }

    fn revoke_rights_touching(&mut self, sq: Square) {
        let lost = match sq {
            WHITE_KING_HOME => WHITE_KINGSIDE | WHITE_QUEENSIDE,
            WHITE_ROOK_A_HOME => WHITE_QUEENSIDE,
            WHITE_ROOK_H_HOME => WHITE_KINGSIDE,
            BLACK_KING_HOME => BLACK_KINGSIDE | BLACK_QUEENSIDE,
            BLACK_ROOK_A_HOME => BLACK_QUEENSIDE,
            BLACK_ROOK_H_HOME => BLACK_KINGSIDE,
            _ => 0,
        };
        if lost != 0 && self.castling_rights & lost != 0 {
            self.set_castling_rights(self.castling_rights & !lost);
        }
    }

    /// Applies `m` in place, returning the snapshot needed to undo it.
    pub fn make_move(&mut self, m: Move) -> UnmakeInfo {
        let undo = UnmakeInfo {
            captured: m.captured,
            prev_castling_rights: self.castling_rights,
            prev_en_passant_file: self.en_passant_file,
            prev_hash: self.hash,
        };

        let us = self.side_to_move;
        let them = us.opposite();
        let moving_piece = self
            .piece_at(m.from)
            .map(|(_, p)| p)
            .unwrap_or(Piece::Pawn);

        if m.is_en_passant {
            let captured_sq = Square::new(m.from.rank(), m.to.file());
            self.remove_piece(them, Piece::Pawn, captured_sq);
        } else if let Some(captured) = m.captured {
            self.remove_piece(them, captured, m.to);
        }

        self.remove_piece(us, moving_piece, m.from);
        let arriving = m.promotion.unwrap_or(moving_piece);
        self.put_piece(us, arriving, m.to);

        if m.is_castling {
            let (rook_from, rook_to) = castling_rook_squares(m.from, m.to);
            self.remove_piece(us, Piece::Rook, rook_from);
            self.put_piece(us, Piece::Rook, rook_to);
        }

        self.revoke_rights_touching(m.from);
        self.revoke_rights_touching(m.to);

        let new_ep = if moving_piece == Piece::Pawn && m.from.rank().abs_diff(m.to.rank()) == 2 {
            let file = m.from.file();
            let target_rank = m.to.rank();
            let enemy_pawns = self.pieces[them.index()][Piece::Pawn.index()];
            let answerable = [file.checked_sub(1), Some(file + 1)]
                .into_iter()
                .flatten()
                .filter(|&f| f < 8)
                .any(|f| enemy_pawns & bitboard::sq_bb(Square::new(target_rank, f)) != 0);
            if answerable {
                Some(file)
            } else {
                None
            }
        } else {
            None
        };
        self.set_en_passant_file(new_ep);

        self.hash ^= zobrist::side_to_move_key();
        self.side_to_move = them;

        undo
    }

    /// Exact inverse of `make_move`, restoring the position bit-for-bit.
    pub fn unmake_move(&mut self, m: Move, undo: UnmakeInfo) {
        let them = self.side_to_move;
        let us = them.opposite();
        self.side_to_move = us;

        let arriving = m
            .promotion
            .or_else(|| self.piece_at(m.to).map(|(_, p)| p))
            .unwrap_or(Piece::Pawn);
        let original_piece = if m.promotion.is_some() {
            Piece::Pawn
        } else {
            arriving
        };

        self.pieces[us.index()][arriving.index()] &= !bitboard::sq_bb(m.to);
        self.occ[us.index()] &= !bitboard::sq_bb(m.to);
        self.occ_all &= !bitboard::sq_bb(m.to);

        self.pieces[us.index()][original_piece.index()] |= bitboard::sq_bb(m.from);
        self.occ[us.index()] |= bitboard::sq_bb(m.from);
        self.occ_all |= bitboard::sq_bb(m.from);
        if original_piece == Piece::King {
            self.king_square[us.index()] = m.from;
        }

        if m.is_castling {
            let (rook_from, rook_to) = castling_rook_squares(m.from, m.to);
            self.pieces[us.index()][Piece::Rook.index()] &= !bitboard::sq_bb(rook_to);
            self.occ[us.index()] &= !bitboard::sq_bb(rook_to);
            self.occ_all &= !bitboard::sq_bb(rook_to);
            self.pieces[us.index()][Piece::Rook.index()] |= bitboard::sq_bb(rook_from);
            self.occ[us.index()] |= bitboard::sq_bb(rook_from);
            self.occ_all |= bitboard::sq_bb(rook_from);
        }

        if m.is_en_passant {
            let captured_sq = Square::new(m.from.rank(), m.to.file());
            self.pieces[them.index()][Piece::Pawn.index()] |= bitboard::sq_bb(captured_sq);
            self.occ[them.index()] |= bitboard::sq_bb(captured_sq);
            self.occ_all |= bitboard::sq_bb(captured_sq);
        } else if let Some(captured) = undo.captured {
            self.pieces[them.index()][captured.index()] |= bitboard::sq_bb(m.to);
            self.occ[them.index()] |= bitboard::sq_bb(m.to);
            self.occ_all |= bitboard::sq_bb(m.to);
        }

        self.castling_rights = undo.prev_castling_rights;
        self.en_passant_file = undo.prev_en_passant_file;
        self.hash = undo.prev_hash;
    }

    /// Passes the turn without moving a piece (null-move pruning).
    pub fn make_null(&mut self) -> NullInfo {
        let info = NullInfo {
            prev_en_passant_file: self.en_passant_file,
            prev_hash: self.hash,
        };
        self.set_en_passant_file(None);
        self.hash ^= zobrist::side_to_move_key();
        self.side_to_move = self.side_to_move.opposite();
        info
    }

    pub fn unmake_null(&mut self, info: NullInfo) {
        self.side_to_move = self.side_to_move.opposite();
        self.en_passant_file = info.prev_en_passant_file;
        self.hash = info.prev_hash;
    }

    /// True if any piece of `by_color` attacks `sq`.
    pub fn is_attacked(&self, sq: Square, by_color: Color) -> bool {
        let occ = self.occ_all;
        let enemy_pawns = self.pieces[by_color.index()][Piece::Pawn.index()];
        // Pawn attacks on `sq` by `by_color` look the same as `sq`'s own
        // attack set for the opposite color, intersected with enemy pawns.
        if bitboard::pawn_attacks(sq, by_color.opposite()) & enemy_pawns != 0 {
            return true;
        }
        if bitboard::knight_attacks(sq) & self.pieces[by_color.index()][Piece::Knight.index()] != 0 {
            return true;
        }
        if bitboard::king_attacks(sq) & self.pieces[by_color.index()][Piece::King.index()] != 0 {
            return true;
        }
        let rooks_queens = self.pieces[by_color.index()][Piece::Rook.index()]
            | self.pieces[by_color.index()][Piece::Queen.index()];
        if magic::rook_attacks(sq, occ) & rooks_queens != 0 {
            return true;
        }
        let bishops_queens = self.pieces[by_color.index()][Piece::Bishop.index()]
            | self.pieces[by_color.index()][Piece::Queen.index()];
        if magic::bishop_attacks(sq, occ) & bishops_queens != 0 {
            return true;
        }
        false
    }

    #[inline]
    pub fn in_check(&self, color: Color) -> bool {
        self.is_attacked(self.king_square(color), color.opposite())
    }

    /// No pawns, no rooks, no queens, and at most three total pieces left.
    pub fn is_insufficient_material(&self) -> bool {
        let no_heavy = self.all_pieces_of(Piece::Pawn) == 0
            && self.all_pieces_of(Piece::Rook) == 0
            && self.all_pieces_of(Piece::Queen) == 0;
        no_heavy && bitboard::popcount(self.occ_all) <= 3
    }

    /// Conservative zugzwang guard for null-move pruning: only kings and
    /// pawns remain for the side to move.
    pub fn side_to_move_has_only_pawns(&self) -> bool {
        let us = self.side_to_move.index();
        self.pieces[us][Piece::Knight.index()] == 0
            && self.pieces[us][Piece::Bishop.index()] == 0
            && self.pieces[us][Piece::Rook.index()] == 0
            && self.pieces[us][Piece::Queen.index()] == 0
    }

    pub fn game_phase(&self) -> i32 {
        const WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];
        let mut phase = 0;
        for piece in crate::types::PIECES {
            let count = bitboard::popcount(self.all_pieces_of(piece)) as i32;
            phase += count * WEIGHTS[piece.index()];
        }
        phase.clamp(0, 24)
    }
}

fn castling_rook_squares(king_from: Square, king_to: Square) -> (Square, Square) {
    let rank = king_from.rank();
    if king_to.file() > king_from.file() {
        (Square::new(rank, 7), Square::new(rank, 5))
    } else {
        (Square::new(rank, 0), Square::new(rank, 3))
    }
}

pub fn bound_flag_allows_cutoff(
    bound: BoundType,
    stored_score: i32,
    alpha: i32,
    beta: i32,
) -> Option<i32> {
    match bound {
        BoundType::Exact => Some(stored_score),
        BoundType::Lower if stored_score >= beta => Some(beta),
        BoundType::Upper if stored_score <= alpha => Some(alpha),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_32_pieces_and_white_to_move() {
        let pos = Position::startpos();
        assert_eq!(bitboard::popcount(pos.occupied()), 32);
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.castling_rights(), ALL_CASTLING_RIGHTS);
    }

    #[test]
    fn make_unmake_round_trips_a_quiet_pawn_push() {
        let mut pos = Position::startpos();
        let before_hash = pos.hash();
        let m = Move::quiet(Square::new(1, 4), Square::new(3, 4));
        let undo = pos.make_move(m);
        assert_ne!(pos.hash(), before_hash);
        pos.unmake_move(m, undo);
        assert_eq!(pos.hash(), before_hash);
        assert_eq!(bitboard::popcount(pos.occupied()), 32);
    }

    #[test]
    fn double_push_sets_en_passant_only_when_answerable() {
        let mut pos = Position::from_fen("8/8/8/8/8/8/p7/7K b - -");
        let m = Move::quiet(Square::new(6, 0), Square::new(4, 0));
        pos.make_move(m);
        assert_eq!(pos.en_passant_file(), None);
    }
}
