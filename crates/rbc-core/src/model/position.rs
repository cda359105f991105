use super::{Color, Occupant, ParseError, Piece, PieceKind, Square};
use crate::rules::{RulesOracle, StandardRules};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    pub const BOTH: [CastleSide; 2] = [CastleSide::KingSide, CastleSide::QueenSide];

    pub fn king_home(color: Color) -> Square {
        match color {
            Color::White => Square::E1,
            Color::Black => Square::E8,
        }
    }

    pub fn rook_home(self, color: Color) -> Square {
        match (self, color) {
            (CastleSide::KingSide, Color::White) => Square::H1,
            (CastleSide::QueenSide, Color::White) => Square::A1,
            (CastleSide::KingSide, Color::Black) => Square::H8,
            (CastleSide::QueenSide, Color::Black) => Square::A8,
        }
    }

    pub fn king_target(self, color: Color) -> Square {
        match (self, color) {
            (CastleSide::KingSide, Color::White) => Square::G1,
            (CastleSide::QueenSide, Color::White) => Square::C1,
            (CastleSide::KingSide, Color::Black) => Square::G8,
            (CastleSide::QueenSide, Color::Black) => Square::C8,
        }
    }

    pub fn rook_target(self, color: Color) -> Square {
        match (self, color) {
            (CastleSide::KingSide, Color::White) => Square::F1,
            (CastleSide::QueenSide, Color::White) => Square::D1,
            (CastleSide::KingSide, Color::Black) => Square::F8,
            (CastleSide::QueenSide, Color::Black) => Square::D8,
        }
    }

    /// Side implied by a king move from its home square, if the move is a castle.
    pub fn from_king_move(color: Color, from: Square, to: Square) -> Option<CastleSide> {
        if from != Self::king_home(color) {
            return None;
        }
        CastleSide::BOTH
            .into_iter()
            .find(|side| side.king_target(color) == to)
    }

    const fn fen_char(self, color: Color) -> char {
        match (self, color) {
            (CastleSide::KingSide, Color::White) => 'K',
            (CastleSide::QueenSide, Color::White) => 'Q',
            (CastleSide::KingSide, Color::Black) => 'k',
            (CastleSide::QueenSide, Color::Black) => 'q',
        }
    }
}

/// Castling rights as four flag bits (`K`, `Q`, `k`, `q`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    const fn bit(color: Color, side: CastleSide) -> u8 {
        match (color, side) {
            (Color::White, CastleSide::KingSide) => 1,
            (Color::White, CastleSide::QueenSide) => 2,
            (Color::Black, CastleSide::KingSide) => 4,
            (Color::Black, CastleSide::QueenSide) => 8,
        }
    }

    pub const fn has(self, color: Color, side: CastleSide) -> bool {
        self.0 & Self::bit(color, side) != 0
    }

    pub fn has_any(self, color: Color) -> bool {
        CastleSide::BOTH.into_iter().any(|side| self.has(color, side))
    }

    pub fn insert(&mut self, color: Color, side: CastleSide) {
        self.0 |= Self::bit(color, side);
    }

    pub fn remove(&mut self, color: Color, side: CastleSide) {
        self.0 &= !Self::bit(color, side);
    }

    pub fn remove_color(&mut self, color: Color) {
        for side in CastleSide::BOTH {
            self.remove(color, side);
        }
    }

    /// Rights lost when a piece leaves or lands on `square`.
    pub fn touch(&mut self, square: Square) {
        for color in Color::BOTH {
            if square == CastleSide::king_home(color) {
                self.remove_color(color);
            }
            for side in CastleSide::BOTH {
                if square == side.rook_home(color) {
                    self.remove(color, side);
                }
            }
        }
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn to_fen(self) -> String {
        if self.is_empty() {
            return "-".to_string();
        }
        let mut text = String::with_capacity(4);
        for color in Color::BOTH {
            for side in CastleSide::BOTH {
                if self.has(color, side) {
                    text.push(side.fen_char(color));
                }
            }
        }
        text
    }

    fn from_fen(field: &str) -> Option<Self> {
        if field == "-" {
            return Some(Self::NONE);
        }
        let mut rights = Self::NONE;
        for symbol in field.chars() {
            let (color, side) = match symbol {
                'K' => (Color::White, CastleSide::KingSide),
                'Q' => (Color::White, CastleSide::QueenSide),
                'k' => (Color::Black, CastleSide::KingSide),
                'q' => (Color::Black, CastleSide::QueenSide),
                _ => return None,
            };
            rights.insert(color, side);
        }
        Some(rights)
    }
}

/// A full chess position snapshot.
///
/// Positions are kept in canonical form: castling rights only survive while the king and
/// the matching rook stand on their home squares, and the en-passant square only survives
/// while a pawn of the side to move could capture onto it. Two positions are therefore
/// equal exactly when their FEN strings are equal.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Position {
    pub(crate) board: [Option<Piece>; 64],
    pub(crate) turn: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
}

impl Position {
    pub fn starting() -> Self {
        let mut board = [None; 64];
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (file, kind) in back.into_iter().enumerate() {
            board[file] = Some(Piece::new(kind, Color::White));
            board[8 + file] = Some(Piece::new(PieceKind::Pawn, Color::White));
            board[48 + file] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            board[56 + file] = Some(Piece::new(kind, Color::Black));
        }
        Self {
            board,
            turn: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidFen(fen.to_string());
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(invalid());
        }

        let mut board = [None; 64];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid());
        }
        for (row, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - row as u8;
            let mut file: u8 = 0;
            for symbol in rank_text.chars() {
                if let Some(skip) = symbol.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(invalid());
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_symbol(symbol).ok_or_else(invalid)?;
                    let square = Square::from_coords(file, rank).ok_or_else(invalid)?;
                    board[square.index()] = Some(piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(invalid());
                }
            }
            if file != 8 {
                return Err(invalid());
            }
        }

        let turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(invalid()),
        };
        let castling = CastlingRights::from_fen(fields[2]).ok_or_else(invalid)?;
        let en_passant = match fields[3] {
            "-" => None,
            square => Some(square.parse::<Square>().map_err(|_| invalid())?),
        };
        let halfmove_clock = match fields.get(4) {
            Some(text) => text.parse().map_err(|_| invalid())?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(text) => text.parse::<u32>().map_err(|_| invalid())?.max(1),
            None => 1,
        };

        let mut position = Self {
            board,
            turn,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        };
        position.canonicalize();
        Ok(position)
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut gap = 0;
            for file in 0..8u8 {
                match Square::from_coords(file, rank).and_then(|sq| self.board[sq.index()]) {
                    Some(piece) => {
                        if gap > 0 {
                            placement.push(char::from(b'0' + gap));
                            gap = 0;
                        }
                        placement.push(piece.symbol());
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                placement.push(char::from(b'0' + gap));
            }
            if rank > 0 {
                placement.push('/');
            }
        }
        let en_passant = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{placement} {} {} {en_passant} {} {}",
            self.turn.fen_char(),
            self.castling.to_fen(),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Plain-text board: eight lines from rank 8 down, `.` for empty squares.
    pub fn board_string(&self) -> String {
        let mut lines = Vec::with_capacity(8);
        for rank in (0..8u8).rev() {
            let row: Vec<String> = (0..8u8)
                .map(|file| {
                    Square::from_coords(file, rank)
                        .and_then(|sq| self.board[sq.index()])
                        .map(|piece| piece.symbol().to_string())
                        .unwrap_or_else(|| ".".to_string())
                })
                .collect();
            lines.push(row.join(" "));
        }
        lines.join("\n")
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.index()]
    }

    pub fn occupant(&self, square: Square) -> Occupant {
        Occupant::from(self.piece_at(square))
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.board[square.index()].is_some()
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.board[sq.index()].map(|piece| (sq, piece)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.color == color)
    }

    /// First king of `color` in index order, if any survives.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| piece.is(PieceKind::King, color))
            .map(|(sq, _)| sq)
    }

    pub fn king_count(&self, color: Color) -> usize {
        self.pieces()
            .filter(|(_, piece)| piece.is(PieceKind::King, color))
            .count()
    }

    /// Places (or clears) a piece and restores canonical form.
    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) {
        self.board[square.index()] = piece;
        self.canonicalize();
    }

    pub fn with_turn(&self, turn: Color) -> Self {
        let mut next = self.clone();
        next.turn = turn;
        next.canonicalize();
        next
    }

    /// The null-move successor: placement unchanged, other side to move, en-passant
    /// cleared, clocks advanced.
    pub fn pass(&self) -> Self {
        let mut next = self.clone();
        next.en_passant = None;
        next.halfmove_clock = next.halfmove_clock.saturating_add(1);
        if next.turn == Color::Black {
            next.fullmove_number = next.fullmove_number.saturating_add(1);
        }
        next.turn = !next.turn;
        next
    }

    /// Copy of the position with every piece of `color` lifted off the board.
    pub fn without_pieces_of(&self, color: Color) -> Self {
        let mut next = self.clone();
        for slot in next.board.iter_mut() {
            if slot.is_some_and(|piece| piece.color == color) {
                *slot = None;
            }
        }
        next.canonicalize();
        next
    }

    pub(crate) fn canonicalize(&mut self) {
        for color in Color::BOTH {
            let king_home = CastleSide::king_home(color);
            let king_ok = self.board[king_home.index()]
                .is_some_and(|piece| piece.is(PieceKind::King, color));
            for side in CastleSide::BOTH {
                let rook_ok = self.board[side.rook_home(color).index()]
                    .is_some_and(|piece| piece.is(PieceKind::Rook, color));
                if !(king_ok && rook_ok) {
                    self.castling.remove(color, side);
                }
            }
        }

        if let Some(target) = self.en_passant {
            if !self.en_passant_capturable(target) {
                self.en_passant = None;
            }
        }
    }

    fn en_passant_capturable(&self, target: Square) -> bool {
        let mover = self.turn;
        let expected_rank = match mover {
            Color::White => 5,
            Color::Black => 2,
        };
        if target.rank() != expected_rank || self.is_occupied(target) {
            return false;
        }
        let behind = -mover.pawn_direction();
        let pushed_pawn = target
            .offset(0, behind)
            .and_then(|sq| self.piece_at(sq))
            .is_some_and(|piece| piece.is(PieceKind::Pawn, !mover));
        if !pushed_pawn {
            return false;
        }
        let Some(victim) = target.offset(0, behind) else {
            return false;
        };
        [-1i8, 1].into_iter().any(|df| {
            target.offset(df, behind).is_some_and(|from| {
                self.piece_at(from)
                    .is_some_and(|piece| piece.is(PieceKind::Pawn, mover))
                    && !self.en_passant_exposes_king(from, victim, target)
            })
        })
    }

    /// Whether capturing en passant from `from` would leave the mover's king attacked.
    /// Boards without a king for the mover never count as exposed.
    fn en_passant_exposes_king(&self, from: Square, victim: Square, target: Square) -> bool {
        let mut after = self.clone();
        after.board[target.index()] = after.board[from.index()].take();
        after.board[victim.index()] = None;
        StandardRules.is_in_check(&after, self.turn)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Position").field(&self.to_fen()).finish()
    }
}

impl FromStr for Position {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl TryFrom<String> for Position {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_fen(&value)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> String {
        position.to_fen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_matches_standard_fen() {
        assert_eq!(Position::starting().to_fen(), STARTING_FEN);
        assert_eq!(Position::from_fen(STARTING_FEN).unwrap(), Position::starting());
    }

    #[test]
    fn fen_round_trip_is_identity_on_canonical_text() {
        let samples = [
            "r3k2r/pppq1ppp/2n2n2/3pp3/3PP3/2N2N2/PPPQ1PPP/R3K2R b KQkq - 4 9",
            "8/8/8/4k3/8/8/8/4K3 w - - 0 50",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "8/8/8/8/8/8/8/8 b - - 12 40",
        ];
        for fen in samples {
            let position = Position::from_fen(fen).unwrap();
            assert_eq!(position.to_fen(), fen);
            assert_eq!(Position::from_fen(&position.to_fen()).unwrap(), position);
        }
    }

    #[test]
    fn short_fen_gets_default_clocks() {
        let err = Position::from_fen("8/8/8/4k3/8/8/8/4K3 w -").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFen(_)));
        let position = Position::from_fen("8/8/8/4k3/8/8/8/4K3 w - -").unwrap();
        assert_eq!(position.halfmove_clock(), 0);
        assert_eq!(position.fullmove_number(), 1);
    }

    #[test]
    fn rejects_malformed_placement() {
        for bad in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq z9 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
        ] {
            assert!(Position::from_fen(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn stale_castling_rights_are_dropped() {
        let position =
            Position::from_fen("rnbqkbn1/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1BNR w KQkq - 0 1")
                .unwrap();
        assert_eq!(position.to_fen().split(' ').nth(2), Some("q"));
    }

    #[test]
    fn uncapturable_en_passant_square_is_dropped() {
        let noisy =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1")
                .unwrap();
        let quiet =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(noisy, quiet);
    }

    #[test]
    fn pinned_en_passant_square_is_dropped() {
        // The d5 pawn is pinned along the fifth rank, so exd6 is not a legal capture.
        let pinned = Position::from_fen("8/8/8/K2Pp2r/8/8/8/7k w - e6 0 2").unwrap();
        assert_eq!(pinned.en_passant(), None);
        let free = Position::from_fen("8/8/8/3Pp3/8/8/8/K6k w - e6 0 2").unwrap();
        assert_eq!(free.en_passant(), "e6".parse().ok());
    }

    #[test]
    fn pass_toggles_turn_and_advances_clocks() {
        let black_to_move =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        let passed = black_to_move.pass();
        assert_eq!(passed.turn(), Color::White);
        assert_eq!(passed.halfmove_clock(), 1);
        assert_eq!(passed.fullmove_number(), 2);
        assert_eq!(Position::starting().pass().fullmove_number(), 1);
    }

    #[test]
    fn board_string_lists_ranks_from_eight_down() {
        let text = Position::starting().board_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "r n b q k b n r");
        assert_eq!(lines[4], ". . . . . . . .");
        assert_eq!(lines[7], "R N B Q K B N R");
    }

    #[test]
    fn stripping_a_side_keeps_the_other() {
        let stripped = Position::starting().without_pieces_of(Color::Black);
        assert_eq!(stripped.pieces_of(Color::Black).count(), 0);
        assert_eq!(stripped.pieces_of(Color::White).count(), 16);
        assert!(stripped.castling().has_any(Color::White));
        assert!(!stripped.castling().has_any(Color::Black));
    }

    #[test]
    fn serde_uses_fen_text() {
        let json = serde_json::to_string(&Position::starting()).unwrap();
        assert_eq!(json, format!("\"{STARTING_FEN}\""));
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Position::starting());
    }
}
