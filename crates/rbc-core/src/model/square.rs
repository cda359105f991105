use super::ParseError;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the 64 board coordinates, a1 = 0 through h8 = 63.
///
/// Ordering follows the index and only exists so output can be sorted deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square(u8);

impl Square {
    pub const COUNT: usize = 64;

    pub const A1: Square = Square(0);
    pub const C1: Square = Square(2);
    pub const D1: Square = Square(3);
    pub const E1: Square = Square(4);
    pub const F1: Square = Square(5);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A8: Square = Square(56);
    pub const C8: Square = Square(58);
    pub const D8: Square = Square(59);
    pub const E8: Square = Square(60);
    pub const F8: Square = Square(61);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);

    pub const fn from_index(index: u8) -> Option<Square> {
        if index < 64 { Some(Square(index)) } else { None }
    }

    pub const fn from_coords(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn file(self) -> u8 {
        self.0 & 7
    }

    pub const fn rank(self) -> u8 {
        self.0 >> 3
    }

    /// Square displaced by `(files, ranks)`, or `None` when it falls off the board.
    pub fn offset(self, files: i8, ranks: i8) -> Option<Square> {
        let file = self.file() as i8 + files;
        let rank = self.rank() as i8 + ranks;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Square::from_coords(file as u8, rank as u8)
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0u8..64).map(Square)
    }

    pub const fn is_edge(self) -> bool {
        let file = self.file();
        let rank = self.rank();
        file == 0 || file == 7 || rank == 0 || rank == 7
    }

    /// The 3×3 block centred on this square, clipped at the board edges.
    pub fn neighborhood(self) -> impl Iterator<Item = Square> {
        (-1i8..=1)
            .rev()
            .flat_map(move |dr| (-1i8..=1).filter_map(move |df| self.offset(df, dr)))
    }

    /// Squares strictly between two squares on a shared rank, file or diagonal.
    pub fn between(self, other: Square) -> Vec<Square> {
        let df = other.file() as i8 - self.file() as i8;
        let dr = other.rank() as i8 - self.rank() as i8;
        let aligned = df == 0 || dr == 0 || df.abs() == dr.abs();
        if !aligned || (df == 0 && dr == 0) {
            return Vec::new();
        }
        let (step_f, step_r) = (df.signum(), dr.signum());
        let mut squares = Vec::new();
        let mut cursor = self.offset(step_f, step_r);
        while let Some(square) = cursor {
            if square == other {
                break;
            }
            squares.push(square);
            cursor = square.offset(step_f, step_r);
        }
        squares
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.file()) as char;
        let rank = (b'1' + self.rank()) as char;
        write!(f, "{file}{rank}")
    }
}

impl FromStr for Square {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseError::InvalidSquare(s.to_string()));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::from_coords(file, rank).ok_or_else(|| ParseError::InvalidSquare(s.to_string()))
    }
}

impl TryFrom<String> for Square {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> String {
        square.to_string()
    }
}
