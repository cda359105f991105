//! Attack detection on the mailbox board.

use crate::model::{Color, PieceKind, Position, Square};

pub(crate) const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

pub(crate) const KING_STEPS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

pub(crate) const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
pub(crate) const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Squares holding a piece of `by` that attacks `target`, in index order.
pub(crate) fn attackers(position: &Position, target: Square, by: Color) -> Vec<Square> {
    let mut found = Vec::new();

    // A pawn of `by` attacks diagonally forward, so look one rank behind the target.
    let behind = -by.pawn_direction();
    for df in [-1i8, 1] {
        if let Some(sq) = target.offset(df, behind) {
            if position
                .piece_at(sq)
                .is_some_and(|p| p.is(PieceKind::Pawn, by))
            {
                found.push(sq);
            }
        }
    }

    for (df, dr) in KNIGHT_STEPS {
        if let Some(sq) = target.offset(df, dr) {
            if position
                .piece_at(sq)
                .is_some_and(|p| p.is(PieceKind::Knight, by))
            {
                found.push(sq);
            }
        }
    }

    for (df, dr) in KING_STEPS {
        if let Some(sq) = target.offset(df, dr) {
            if position
                .piece_at(sq)
                .is_some_and(|p| p.is(PieceKind::King, by))
            {
                found.push(sq);
            }
        }
    }

    for (directions, kind) in [(ORTHOGONAL, PieceKind::Rook), (DIAGONAL, PieceKind::Bishop)] {
        for (df, dr) in directions {
            let mut cursor = target.offset(df, dr);
            while let Some(sq) = cursor {
                if let Some(piece) = position.piece_at(sq) {
                    if piece.color == by
                        && (piece.kind == kind || piece.kind == PieceKind::Queen)
                    {
                        found.push(sq);
                    }
                    break;
                }
                cursor = sq.offset(df, dr);
            }
        }
    }

    found.sort();
    found
}

pub(crate) fn is_attacked(position: &Position, target: Square, by: Color) -> bool {
    !attackers(position, target, by).is_empty()
}

/// True when any king of `color` stands on an attacked square.
pub(crate) fn is_in_check(position: &Position, color: Color) -> bool {
    position
        .pieces_of(color)
        .filter(|(_, piece)| piece.kind == PieceKind::King)
        .any(|(sq, _)| is_attacked(position, sq, !color))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn finds_every_kind_of_attacker() {
        let position = Position::from_fen("4k3/8/8/3p4/2N1r3/4K3/8/B7 w - - 0 1").unwrap();
        assert_eq!(attackers(&position, sq("e4"), Color::White), vec![sq("e3")]);
        assert_eq!(attackers(&position, sq("d5"), Color::White), Vec::<Square>::new());
        assert_eq!(attackers(&position, sq("e3"), Color::Black), vec![sq("e4")]);
        assert_eq!(attackers(&position, sq("c4"), Color::Black), vec![sq("e4"), sq("d5")]);
    }

    #[test]
    fn blockers_stop_sliding_attacks() {
        let position = Position::from_fen("4k3/8/8/8/8/8/4P3/4R2K w - - 0 1").unwrap();
        assert!(!is_attacked(&position, sq("e8"), Color::White));
        assert!(is_attacked(&position, sq("e2"), Color::White));
    }

    #[test]
    fn check_detection_covers_missing_kings() {
        let kingless = Position::from_fen("8/8/8/8/8/8/8/R7 w - - 0 1").unwrap();
        assert!(!is_in_check(&kingless, Color::Black));
        let checked = Position::from_fen("k7/8/8/8/8/8/8/R6K w - - 0 1").unwrap();
        assert!(is_in_check(&checked, Color::Black));
    }
}
