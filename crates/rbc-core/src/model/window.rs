use super::{ParseError, Piece, Position, Square};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// What a sensed square holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Empty,
    Piece(Piece),
}

impl Occupant {
    pub fn piece(self) -> Option<Piece> {
        match self {
            Occupant::Empty => None,
            Occupant::Piece(piece) => Some(piece),
        }
    }

    /// `?` for an empty square, otherwise the FEN letter.
    pub fn token(self) -> char {
        match self {
            Occupant::Empty => '?',
            Occupant::Piece(piece) => piece.symbol(),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let symbol = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        if symbol == '?' {
            return Some(Occupant::Empty);
        }
        Piece::from_symbol(symbol).map(Occupant::Piece)
    }
}

impl From<Option<Piece>> for Occupant {
    fn from(value: Option<Piece>) -> Self {
        match value {
            Some(piece) => Occupant::Piece(piece),
            None => Occupant::Empty,
        }
    }
}

/// A local sensing observation: the true occupant of a handful of squares.
///
/// Text form is `square:token` pairs joined by `;` (e.g. `e7:?;e5:p`), where `?`
/// marks an empty square. Empty segments are ignored, everything else must parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SensingWindow {
    entries: BTreeMap<Square, Occupant>,
}

impl SensingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// The window a referee reports when sensing `centre` on the true `position`.
    pub fn observe(position: &Position, centre: Square) -> Self {
        let entries = centre
            .neighborhood()
            .map(|sq| (sq, position.occupant(sq)))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, square: Square, occupant: Occupant) {
        self.entries.insert(square, occupant);
    }

    pub fn get(&self, square: Square) -> Option<Occupant> {
        self.entries.get(&square).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Square, Occupant)> + '_ {
        self.entries.iter().map(|(sq, occ)| (*sq, *occ))
    }

    pub fn squares(&self) -> impl Iterator<Item = Square> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every observed square agrees with `position`.
    pub fn is_consistent_with(&self, position: &Position) -> bool {
        self.iter()
            .all(|(square, occupant)| position.occupant(square) == occupant)
    }
}

impl FromIterator<(Square, Occupant)> for SensingWindow {
    fn from_iter<I: IntoIterator<Item = (Square, Occupant)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for SensingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (square, occupant) in self.iter() {
            if !first {
                f.write_str(";")?;
            }
            first = false;
            write!(f, "{square}:{}", occupant.token())?;
        }
        Ok(())
    }
}

impl FromStr for SensingWindow {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut window = SensingWindow::new();
        for segment in s.trim().split(';').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            let (square_text, token) = segment
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidWindow(format!("missing ':' in {segment:?}")))?;
            let square: Square = square_text.trim().parse().map_err(|_| {
                ParseError::InvalidWindow(format!("bad square in {segment:?}"))
            })?;
            let occupant = Occupant::from_token(token.trim()).ok_or_else(|| {
                ParseError::InvalidWindow(format!("bad occupant token in {segment:?}"))
            })?;
            if let Some(previous) = window.get(square) {
                if previous != occupant {
                    return Err(ParseError::InvalidWindow(format!(
                        "conflicting observations for {square}"
                    )));
                }
            }
            window.insert(square, occupant);
        }
        Ok(window)
    }
}

impl TryFrom<String> for SensingWindow {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SensingWindow> for String {
    fn from(window: SensingWindow) -> String {
        window.to_string()
    }
}
