//! Standard castling plus the relaxed variant used when the opponent's pieces are unseen.
//!
//! A relaxed castle ignores attacks: the mover cannot see the opponent's pieces, so the
//! referee lets the king castle out of, through or into check. It still needs the right
//! to castle on that side and an empty path between king and rook on the real board.

use super::attacks::is_attacked;
use super::movegen::castle_side;
use crate::model::{CastleSide, Move, PieceKind, Position};

/// Castles available to the side to move under standard rules.
pub(crate) fn standard_castles(position: &Position) -> Vec<Move> {
    let us = position.turn();
    let king_home = CastleSide::king_home(us);
    let king_present = position
        .piece_at(king_home)
        .is_some_and(|p| p.is(PieceKind::King, us));
    if !king_present {
        return Vec::new();
    }

    let mut moves = Vec::new();
    for side in CastleSide::BOTH {
        if !position.castling().has(us, side) {
            continue;
        }
        let rook_home = side.rook_home(us);
        let path_clear = king_home
            .between(rook_home)
            .into_iter()
            .all(|sq| !position.is_occupied(sq));
        if !path_clear {
            continue;
        }
        let king_target = side.king_target(us);
        let mut king_walk = king_home.between(king_target);
        king_walk.push(king_home);
        king_walk.push(king_target);
        if king_walk.into_iter().any(|sq| is_attacked(position, sq, !us)) {
            continue;
        }
        moves.push(Move::new(king_home, king_target));
    }
    moves
}

/// Castles available when every opponent piece is treated as invisible.
pub(crate) fn relaxed_castles(position: &Position) -> Vec<Move> {
    let stripped = position.without_pieces_of(!position.turn());
    standard_castles(&stripped)
        .into_iter()
        .filter(|mv| !is_illegal_relaxed_castle(position, *mv))
        .collect()
}

/// Rejects a castle on the real board when the right is gone or anything stands between
/// king and rook. Moves that are not castles are never rejected here.
pub(crate) fn is_illegal_relaxed_castle(position: &Position, mv: Move) -> bool {
    let Some(side) = castle_side(position, mv) else {
        return false;
    };
    let Some(king) = position.piece_at(mv.from) else {
        return false;
    };
    if !position.castling().has(king.color, side) {
        return true;
    }
    mv.from
        .between(side.rook_home(king.color))
        .into_iter()
        .any(|sq| position.is_occupied(sq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[test]
    fn standard_castling_respects_attacked_squares() {
        // The black rook on f8 covers f1, which the king would pass through.
        let position = Position::from_fen("k4r2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let castles = standard_castles(&position);
        assert_eq!(castles, vec![mv("e1c1")]);
    }

    #[test]
    fn relaxed_castling_passes_through_check() {
        let position = Position::from_fen("k4r2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let castles = relaxed_castles(&position);
        assert_eq!(castles, vec![mv("e1g1"), mv("e1c1")]);
    }

    #[test]
    fn relaxed_castling_needs_an_empty_path_on_the_real_board() {
        // A black knight sits on g1; invisible to us, but the referee still blocks the castle.
        let position = Position::from_fen("k7/8/8/8/8/8/8/R3K1nR w KQ - 0 1").unwrap();
        assert_eq!(relaxed_castles(&position), vec![mv("e1c1")]);
        assert!(is_illegal_relaxed_castle(&position, mv("e1g1")));
    }

    #[test]
    fn relaxed_castling_needs_the_right() {
        let position = Position::from_fen("k7/8/8/8/8/8/8/R3K2R w Q - 0 1").unwrap();
        assert!(is_illegal_relaxed_castle(&position, mv("e1g1")));
        assert!(!is_illegal_relaxed_castle(&position, mv("e1c1")));
        assert!(!is_illegal_relaxed_castle(&position, mv("e1e2")));
    }
}
