//! Legal move generation.

use super::Position;
use crate::bitboard::{self, Bitboard};
use crate::magic;
use crate::types::{
    Color, Move, MoveList, Piece, Square, BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE,
    WHITE_QUEENSIDE,
};

const PROMOTION_PIECES: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

impl Position {
    /// All legal moves for the side to move.
    pub fn legal_moves(&self) -> MoveList {
        let mut moves = self.pseudo_legal_moves();
        self.retain_legal(&mut moves);
        moves
    }

    /// Captures (including en-passant) and promotions, for quiescence.
    pub fn capture_moves(&self) -> MoveList {
        let mut moves = self.pseudo_legal_moves();
        moves.retain(|m| m.is_capture() || m.promotion.is_some());
        self.retain_legal(&mut moves);
        moves
    }

    fn retain_legal(&self, moves: &mut MoveList) {
        let us = self.side_to_move();
        moves.retain(|&m| {
            let mut scratch = self.clone();
            scratch.make_move(m);
            !scratch.in_check(us)
        });
    }

    fn pseudo_legal_moves(&self) -> MoveList {
        let mut moves = Vec::with_capacity(48);
        let us = self.side_to_move();
        let them = us.opposite();
        let own = self.occupied_by(us);
        let occ = self.occupied();

        self.generate_pawn_moves(&mut moves, us, them);

        for (piece, attacks_fn) in [
            (Piece::Knight, bitboard::knight_attacks as fn(Square) -> Bitboard),
            (Piece::King, bitboard::king_attacks as fn(Square) -> Bitboard),
        ] {
            let mut pieces = self.pieces(us, piece);
            while pieces != 0 {
                let from = bitboard::pop_lsb(&mut pieces);
                let mut targets = attacks_fn(from) & !own;
                while targets != 0 {
                    let to = bitboard::pop_lsb(&mut targets);
                    moves.push(self.make_basic_move(from, to, them));
                }
            }
        }

        for (piece, attacks_fn) in [
            (Piece::Bishop, magic::bishop_attacks as fn(Square, Bitboard) -> Bitboard),
            (Piece::Rook, magic::rook_attacks as fn(Square, Bitboard) -> Bitboard),
            (Piece::Queen, magic::queen_attacks as fn(Square, Bitboard) -> Bitboard),
        ] {
            let mut pieces = self.pieces(us, piece);
            while pieces != 0 {
                let from = bitboard::pop_lsb(&mut pieces);
                let mut targets = attacks_fn(from, occ) & !own;
                while targets != 0 {
                    let to = bitboard::pop_lsb(&mut targets);
                    moves.push(self.make_basic_move(from, to, them));
                }
            }
        }

        self.generate_castling_moves(&mut moves, us);

        moves
    }

    fn make_basic_move(&self, from: Square, to: Square, them: Color) -> Move {
        let captured = self.piece_at(to).filter(|&(c, _)| c == them).map(|(_, p)| p);
        Move {
            from,
            to,
            promotion: None,
            captured,
            is_en_passant: false,
            is_castling: false,
        }
    }

    fn generate_pawn_moves(&self, moves: &mut MoveList, us: Color, them: Color) {
        let pawns = self.pieces(us, Piece::Pawn);
        let occ = self.occupied();
        let enemy = self.occupied_by(them);
        let (forward, start_rank, promo_rank): (i32, u8, u8) = match us {
            Color::White => (1, 1, 7),
            Color::Black => (-1, 6, 0),
        };

        let mut bb = pawns;
        while bb != 0 {
            let from = bitboard::pop_lsb(&mut bb);
            let one_rank = from.rank() as i32 + forward;
            if (0..8).contains(&one_rank) {
                let one = Square::new(one_rank as u8, from.file());
                if occ & bitboard::sq_bb(one) == 0 {
                    self.push_pawn_move(moves, from, one, None, promo_rank);
                    if from.rank() == start_rank {
                        let two_rank = (one_rank + forward) as u8;
                        let two = Square::new(two_rank, from.file());
                        if occ & bitboard::sq_bb(two) == 0 {
                            moves.push(Move::quiet(from, two));
                        }
                    }
                }
            }

            for df in [-1i32, 1] {
                let f = from.file() as i32 + df;
                if !(0..8).contains(&f) || !(0..8).contains(&one_rank) {
                    continue;
                }
                let to = Square::new(one_rank as u8, f as u8);
                if enemy & bitboard::sq_bb(to) != 0 {
                    let captured = self.piece_at(to).map(|(_, p)| p);
                    self.push_pawn_move(moves, from, to, captured, promo_rank);
                } else if Some(f as u8) == self.en_passant_file()
                    && to.rank() as i32 == from.rank() as i32 + forward
                    && self.en_passant_capture_rank(us) == from.rank()
                {
                    moves.push(Move {
                        from,
                        to,
                        promotion: None,
                        captured: Some(Piece::Pawn),
                        is_en_passant: true,
                        is_castling: false,
                    });
                }
            }
        }
    }

    fn en_passant_capture_rank(&self, us: Color) -> u8 {
        match us {
            Color::White => 4,
            Color::Black => 3,
        }
    }

    fn push_pawn_move(
        &self,
        moves: &mut MoveList,
        from: Square,
        to: Square,
        captured: Option<Piece>,
        promo_rank: u8,
    ) {
        if to.rank() == promo_rank {
            for &piece in &PROMOTION_PIECES {
                moves.push(Move {
                    from,
                    to,
                    promotion: Some(piece),
                    captured,
                    is_en_passant: false,
                    is_castling: false,
                });
            }
        } else {
            moves.push(Move {
                from,
                to,
                promotion: None,
                captured,
                is_en_passant: false,
                is_castling: false,
            });
        }
    }

    fn generate_castling_moves(&self, moves: &mut MoveList, us: Color) {
        if self.in_check(us) {
            return;
        }
        let occ = self.occupied();
        let rank = match us {
            Color::White => 0u8,
            Color::Black => 7u8,
        };
        let (king_side, queen_side) = match us {
            Color::White => (WHITE_KINGSIDE, WHITE_QUEENSIDE),
            Color::Black => (BLACK_KINGSIDE, BLACK_QUEENSIDE),
        };
        let king_from = Square::new(rank, 4);
        let them = us.opposite();

        if self.castling_rights() & king_side != 0 {
            let f_sq = Square::new(rank, 5);
            let g_sq = Square::new(rank, 6);
            if occ & (bitboard::sq_bb(f_sq) | bitboard::sq_bb(g_sq)) == 0
                && !self.is_attacked(f_sq, them)
                && !self.is_attacked(g_sq, them)
            {
                moves.push(Move {
                    from: king_from,
                    to: g_sq,
                    promotion: None,
                    captured: None,
                    is_en_passant: false,
                    is_castling: true,
                });
            }
        }

        if self.castling_rights() & queen_side != 0 {
            let d_sq = Square::new(rank, 3);
            let c_sq = Square::new(rank, 2);
            let b_sq = Square::new(rank, 1);
            if occ & (bitboard::sq_bb(d_sq) | bitboard::sq_bb(c_sq) | bitboard::sq_bb(b_sq)) == 0
                && !self.is_attacked(d_sq, them)
                && !self.is_attacked(c_sq, them)
            {
                moves.push(Move {
                    from: king_from,
                    to: c_sq,
                    promotion: None,
                    captured: None,
                    is_en_passant: false,
                    is_castling: true,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_twenty_legal_moves() {
        let pos = Position::startpos();
        assert_eq!(pos.legal_moves().len(), 20);
    }

    #[test]
    fn kiwipete_has_forty_eight_legal_moves() {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
        );
        assert_eq!(pos.legal_moves().len(), 48);
    }

    #[test]
    fn pinned_piece_cannot_move_and_expose_king() {
        let pos = Position::from_fen("4k3/8/8/8/8/4r3/4Q3/4K3 w - -");
        for m in pos.legal_moves() {
            assert!(m.from != Square::new(1, 4) || m.to.file() == 4);
        }
    }
}
