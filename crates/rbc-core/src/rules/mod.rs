//! Board-rules oracle.
//!
//! The belief machinery never inspects piece movement directly; it asks a [`RulesOracle`].
//! [`StandardRules`] is the mailbox implementation shipped with the crate. It accepts the
//! positions that arise under partial observability (missing kings, side not to move in
//! check) that strict chess libraries refuse to load.

mod attacks;
mod castling;
mod movegen;

use crate::model::{Color, Move, Piece, PieceKind, Position, Square, chess_move::sort_by_uci};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("no piece on {0} to move")]
    EmptySquare(Square),
}

pub trait RulesOracle {
    fn pseudo_legal_moves(&self, position: &Position) -> Vec<Move>;

    fn legal_moves(&self, position: &Position) -> Vec<Move>;

    /// Square of the piece `mv` would capture (the passed pawn for en passant), if any.
    fn capture_square(&self, position: &Position, mv: Move) -> Option<Square>;

    fn apply(&self, position: &Position, mv: Move) -> Result<Position, RulesError>;

    fn relaxed_castling_moves(&self, position: &Position) -> Vec<Move>;

    fn is_illegal_relaxed_castle(&self, position: &Position, mv: Move) -> bool;

    /// Pieces of `by` attacking `target`, in square order.
    fn attackers(&self, position: &Position, target: Square, by: Color) -> Vec<Square>;

    fn is_in_check(&self, position: &Position, color: Color) -> bool;

    fn is_capture(&self, position: &Position, mv: Move) -> bool {
        self.capture_square(position, mv).is_some()
    }

    fn piece_at(&self, position: &Position, square: Square) -> Option<Piece> {
        position.piece_at(square)
    }

    fn is_pseudo_legal(&self, position: &Position, mv: Move) -> bool {
        self.pseudo_legal_moves(position).contains(&mv)
    }

    /// Every move the side to move might have made: pseudo-legal moves plus relaxed
    /// castles, deduplicated and sorted by UCI text. The null move is not included.
    fn candidate_moves(&self, position: &Position) -> Vec<Move> {
        let mut moves = self.pseudo_legal_moves(position);
        for castle in self.relaxed_castling_moves(position) {
            if !moves.contains(&castle) {
                moves.push(castle);
            }
        }
        sort_by_uci(&mut moves);
        moves.dedup();
        moves
    }

    /// True when `mv` pseudo-legally lands on a king of the side not to move.
    fn captures_king(&self, position: &Position, mv: Move) -> bool {
        let them = !position.turn();
        self.capture_square(position, mv)
            .and_then(|sq| position.piece_at(sq))
            .is_some_and(|p| p.is(PieceKind::King, them))
            && self.is_pseudo_legal(position, mv)
    }

    /// Whether a conventional engine can be handed this position: exactly one king per
    /// side and the side that just moved is not left in check.
    fn is_engine_safe(&self, position: &Position) -> bool {
        Color::BOTH
            .into_iter()
            .all(|color| position.king_count(color) == 1)
            && !self.is_in_check(position, !position.turn())
    }
}

/// Standard chess movement on a mailbox board.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl RulesOracle for StandardRules {
    fn pseudo_legal_moves(&self, position: &Position) -> Vec<Move> {
        movegen::pseudo_legal(position)
    }

    fn legal_moves(&self, position: &Position) -> Vec<Move> {
        movegen::legal(position)
    }

    fn capture_square(&self, position: &Position, mv: Move) -> Option<Square> {
        movegen::capture_square(position, mv)
    }

    fn apply(&self, position: &Position, mv: Move) -> Result<Position, RulesError> {
        movegen::apply(position, mv)
    }

    fn relaxed_castling_moves(&self, position: &Position) -> Vec<Move> {
        castling::relaxed_castles(position)
    }

    fn is_illegal_relaxed_castle(&self, position: &Position, mv: Move) -> bool {
        castling::is_illegal_relaxed_castle(position, mv)
    }

    fn attackers(&self, position: &Position, target: Square, by: Color) -> Vec<Square> {
        attacks::attackers(position, target, by)
    }

    fn is_in_check(&self, position: &Position, color: Color) -> bool {
        attacks::is_in_check(position, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn candidate_moves_add_relaxed_castles_once() {
        let position = Position::from_fen("k4r2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let rules = StandardRules;
        let candidates = rules.candidate_moves(&position);
        assert!(candidates.contains(&mv("e1g1")));
        assert_eq!(candidates.iter().filter(|m| **m == mv("e1c1")).count(), 1);
        assert!(!rules.pseudo_legal_moves(&position).contains(&mv("e1g1")));
    }

    #[test]
    fn king_capture_detection() {
        let rules = StandardRules;
        let position = Position::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1").unwrap();
        assert!(rules.captures_king(&position, mv("e1e8")));
        assert!(!rules.captures_king(&position, mv("e1e7")));
        // With black to move the same rook move is not ours to make.
        let theirs = Position::from_fen("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
        assert!(!rules.captures_king(&theirs, mv("e1e8")));
    }

    #[test]
    fn engine_safety_needs_both_kings_and_no_hanging_king() {
        let rules = StandardRules;
        assert!(rules.is_engine_safe(&Position::starting()));
        let kingless = Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(!rules.is_engine_safe(&kingless));
        // Black just moved but white to move can take the black king.
        let hanging = Position::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1").unwrap();
        assert!(!rules.is_engine_safe(&hanging));
    }

    #[test]
    fn capture_flag_matches_target_occupancy() {
        let rules = StandardRules;
        let position =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        assert!(rules.is_capture(&position, mv("e4d5")));
        assert!(!rules.is_capture(&position, mv("e4e5")));
    }
}
