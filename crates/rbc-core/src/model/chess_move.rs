use super::{ParseError, PieceKind, Square};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A move in UCI terms: origin, destination and an optional promotion piece.
///
/// Castling is spelled as the king's two-square step (`e1g1`). The reserved null move
/// (`0000`) means "no move made"; it has identical origin and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub const NULL: Move = Move {
        from: Square::A1,
        to: Square::A1,
        promotion: None,
    };

    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub const fn with_promotion(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    pub fn is_null(&self) -> bool {
        self.from == self.to
    }

    pub fn uci(&self) -> String {
        self.to_string()
    }
}

/// Sorts moves by their UCI spelling, the only ordering used for tie-breaks.
pub fn sort_by_uci(moves: &mut [Move]) {
    moves.sort_by_cached_key(Move::uci);
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("0000");
        }
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text == "0000" {
            return Ok(Move::NULL);
        }
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(ParseError::InvalidMove(s.to_string()));
        }
        let invalid = |_| ParseError::InvalidMove(s.to_string());
        let from: Square = text[0..2].parse().map_err(invalid)?;
        let to: Square = text[2..4].parse().map_err(invalid)?;
        if from == to {
            return Err(ParseError::InvalidMove(s.to_string()));
        }
        let promotion = match text[4..].chars().next() {
            None => None,
            Some(symbol) => match PieceKind::from_symbol(symbol) {
                Some(kind) if PieceKind::PROMOTIONS.contains(&kind) => Some(kind),
                _ => return Err(ParseError::InvalidMove(s.to_string())),
            },
        };
        Ok(Move {
            from,
            to,
            promotion,
        })
    }
}

impl TryFrom<String> for Move {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Move> for String {
    fn from(mv: Move) -> String {
        mv.to_string()
    }
}
