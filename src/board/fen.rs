//! FEN parsing and formatting. Parsing is always best-effort: a malformed
//! FEN never panics, it falls back to sane defaults and (optionally) logs
//! why.

use super::Position;
use crate::bitboard;
use crate::types::{
    Color, Piece, Square, ALL_CASTLING_RIGHTS, BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE,
    WHITE_QUEENSIDE,
};
use crate::zobrist;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenError {
    TooFewFields,
    BadPlacement,
    BadSideToMove,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewFields => write!(f, "FEN has fewer than 4 space-separated fields"),
            FenError::BadPlacement => write!(f, "FEN piece placement field is malformed"),
            FenError::BadSideToMove => write!(f, "FEN side-to-move field is neither 'w' nor 'b'"),
        }
    }
}

fn char_to_piece(c: char) -> Option<(Color, Piece)> {
    let color = if c.is_ascii_uppercase() {
        Color::White
    } else {
        Color::Black
    };
    let piece = match c.to_ascii_lowercase() {
        'p' => Piece::Pawn,
        'n' => Piece::Knight,
        'b' => Piece::Bishop,
        'r' => Piece::Rook,
        'q' => Piece::Queen,
        'k' => Piece::King,
        _ => return None,
    };
    Some((color, piece))
}

fn piece_to_char(color: Color, piece: Piece) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    if color == Color::White {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

fn parse_placement(pos: &mut Position, field: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadPlacement);
    }
    for (rank_from_top, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - rank_from_top as u8;
        let mut file = 0u8;
        for c in rank_str.chars() {
            if file > 8 {
                return Err(FenError::BadPlacement);
            }
            if let Some(skip) = c.to_digit(10) {
                file += skip as u8;
                continue;
            }
            if let Some((color, piece)) = char_to_piece(c) {
                if file >= 8 {
                    return Err(FenError::BadPlacement);
                }
                pos.put_piece(color, piece, Square::new(rank, file));
                file += 1;
            } else {
                return Err(FenError::BadPlacement);
            }
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> u8 {
    if field == "-" {
        return 0;
    }
    let mut rights = 0u8;
    for c in field.chars() {
        rights |= match c {
            'K' => WHITE_KINGSIDE,
            'Q' => WHITE_QUEENSIDE,
            'k' => BLACK_KINGSIDE,
            'q' => BLACK_QUEENSIDE,
            _ => 0,
        };
    }
    rights
}

fn castling_to_string(rights: u8) -> String {
    if rights == 0 {
        return "-".to_string();
    }
    let mut s = String::new();
    if rights & WHITE_KINGSIDE != 0 {
        s.push('K');
    }
    if rights & WHITE_QUEENSIDE != 0 {
        s.push('Q');
    }
    if rights & BLACK_KINGSIDE != 0 {
        s.push('k');
    }
    if rights & BLACK_QUEENSIDE != 0 {
        s.push('q');
    }
    s
}

/// Keeps the en-passant file only if a pawn of the side to move currently
/// sits adjacent to the capture target, as required so the fingerprint
/// stays path-independent.
fn normalize_en_passant(pos: &Position, target: Square) -> Option<u8> {
    let side = pos.side_to_move();
    let our_pawns = pos.pieces(side, Piece::Pawn);
    // `target` is the square the double-stepping pawn passed over (FEN
    // convention), one rank behind the pawn our side would capture with.
    let (expected_target_rank, capturing_pawn_rank) = match side {
        Color::White => (5u8, 4u8),
        Color::Black => (2u8, 3u8),
    };
    if target.rank() != expected_target_rank {
        return None;
    }
    let file = target.file();
    let answerable = [file.checked_sub(1), Some(file + 1)]
        .into_iter()
        .flatten()
        .filter(|&f| f < 8)
        .any(|f| our_pawns & bitboard::sq_bb(Square::new(capturing_pawn_rank, f)) != 0);
    if answerable {
        Some(file)
    } else {
        None
    }
}

fn recompute_hash(pos: &mut Position) {
    let mut hash = 0u64;
    for color in [Color::White, Color::Black] {
        for piece in crate::types::PIECES {
            let mut bb = pos.pieces(color, piece);
            while bb != 0 {
                let sq = bitboard::pop_lsb(&mut bb);
                hash ^= zobrist::piece_key(color, piece, sq.index());
            }
        }
    }
    hash ^= zobrist::castling_key(pos.castling_rights());
    hash ^= zobrist::en_passant_key(pos.en_passant_file());
    if pos.side_to_move() == Color::Black {
        hash ^= zobrist::side_to_move_key();
    }
    pos.hash = hash;
}

impl Position {
    /// Best-effort FEN parser. On any error the side defaults to white, with
    /// no castling rights and no en-passant target, and the reason is
    /// logged rather than propagated.
    pub fn from_fen(fen: &str) -> Position {
        let mut pos = Position {
            pieces: [[0; 6]; 2],
            occ: [0; 2],
            occ_all: 0,
            side_to_move: Color::White,
            castling_rights: 0,
            en_passant_file: None,
            king_square: [Square(4), Square(60)],
            hash: 0,
        };

        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            #[cfg(feature = "logging")]
            log::warn!("FEN '{fen}': {}", FenError::TooFewFields);
            recompute_hash(&mut pos);
            return pos;
        }

        if let Err(e) = parse_placement(&mut pos, fields[0]) {
            #[cfg(feature = "logging")]
            log::warn!("FEN '{fen}': {e}");
            #[cfg(not(feature = "logging"))]
            let _ = e;
            pos = Position {
                pieces: [[0; 6]; 2],
                occ: [0; 2],
                occ_all: 0,
                side_to_move: Color::White,
                castling_rights: 0,
                en_passant_file: None,
                king_square: [Square(4), Square(60)],
                hash: 0,
            };
        }

        pos.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => {
                #[cfg(feature = "logging")]
                log::warn!("FEN '{fen}': {}", FenError::BadSideToMove);
                Color::White
            }
        };

        pos.castling_rights = parse_castling(fields[2]);

        pos.en_passant_file = Square::from_str_coord(fields[3])
            .and_then(|target| normalize_en_passant(&pos, target));

        recompute_hash(&mut pos);
        pos
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut empty_run = 0u32;
            for file in 0..8u8 {
                match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            placement.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        placement.push(piece_to_char(color, piece));
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                placement.push_str(&empty_run.to_string());
            }
            if rank_from_top != 7 {
                placement.push('/');
            }
        }

        let side = if self.side_to_move == Color::White {
            "w"
        } else {
            "b"
        };
        let castling = castling_to_string(self.castling_rights);
        let ep = match self.en_passant_file {
            Some(file) => {
                let rank = if self.side_to_move == Color::White {
                    5
                } else {
                    2
                };
                Square::new(rank, file).to_string()
            }
            None => "-".to_string(),
        };

        format!("{placement} {side} {castling} {ep}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_fen_round_trips() {
        let pos = Position::startpos();
        assert_eq!(pos.to_fen(), crate::constants::STARTPOS_FEN);
    }

    #[test]
    fn malformed_fen_falls_back_without_panicking() {
        let pos = Position::from_fen("not a fen at all");
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.castling_rights(), 0);
    }

    #[test]
    fn kiwipete_fen_round_trips_placement() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -";
        let pos = Position::from_fen(fen);
        assert_eq!(pos.to_fen(), fen);
        assert_eq!(pos.castling_rights(), ALL_CASTLING_RIGHTS);
    }
}
