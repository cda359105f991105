//! Chess value types shared by the rules oracle, the belief machinery and the agents.
//!
//! - `color`, `piece`, `square`: leaf types with their FEN/UCI spellings.
//! - `chess_move`: UCI move with the reserved null move `0000`.
//! - `position`: canonical position snapshot (FEN round-trip, structural equality).
//! - `window`: local sensing observations and their `square:token` text form.
//! - `action`: what the game boundary reports after one of our move attempts.

pub mod action;
pub mod chess_move;
pub mod color;
pub mod piece;
pub mod position;
pub mod square;
pub mod window;

pub use action::MoveResult;
pub use chess_move::Move;
pub use color::Color;
pub use piece::{Piece, PieceKind};
pub use position::{CastleSide, CastlingRights, Position, STARTING_FEN};
pub use square::Square;
pub use window::{Occupant, SensingWindow};

use thiserror::Error;

/// Failures raised when boundary text (FEN, UCI, squares, sensing windows) is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid FEN string: {0}")]
    InvalidFen(String),
    #[error("invalid square notation: {0:?}")]
    InvalidSquare(String),
    #[error("invalid move notation: {0:?}")]
    InvalidMove(String),
    #[error("invalid sensing window: {0}")]
    InvalidWindow(String),
    #[error("invalid color: {0:?}")]
    InvalidColor(String),
}
