use super::BeliefSet;
use crate::model::{Color, Square};

/// Coarse summary of a belief set, emitted alongside agent decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefMetrics {
    pub size: usize,
    /// Squares whose occupant differs between at least two members.
    pub uncertain_squares: usize,
    /// Share of members with at least one king of each side on the board.
    pub both_kings_ratio: f32,
}

impl BeliefMetrics {
    pub fn from_beliefs(beliefs: &BeliefSet) -> Self {
        let mut iter = beliefs.iter();
        let Some(first) = iter.next() else {
            return Self {
                size: 0,
                uncertain_squares: 0,
                both_kings_ratio: 0.0,
            };
        };

        let mut uncertain = [false; Square::COUNT];
        for position in iter {
            for square in Square::all() {
                if position.piece_at(square) != first.piece_at(square) {
                    uncertain[square.index()] = true;
                }
            }
        }

        let with_kings = beliefs
            .iter()
            .filter(|p| Color::BOTH.into_iter().all(|c| p.king_square(c).is_some()))
            .count();

        Self {
            size: beliefs.len(),
            uncertain_squares: uncertain.iter().filter(|flag| **flag).count(),
            both_kings_ratio: with_kings as f32 / beliefs.len() as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    #[test]
    fn single_member_has_no_uncertainty() {
        let metrics = BeliefMetrics::from_beliefs(&BeliefSet::singleton(Position::starting()));
        assert_eq!(metrics.size, 1);
        assert_eq!(metrics.uncertain_squares, 0);
        assert_eq!(metrics.both_kings_ratio, 1.0);
    }

    #[test]
    fn differing_members_mark_squares() {
        let after_e4 =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        let beliefs: BeliefSet = [Position::starting(), after_e4].into_iter().collect();
        let metrics = BeliefMetrics::from_beliefs(&beliefs);
        assert_eq!(metrics.uncertain_squares, 2);
    }

    #[test]
    fn empty_set_reports_zeroes() {
        let metrics = BeliefMetrics::from_beliefs(&BeliefSet::new());
        assert_eq!(metrics.size, 0);
        assert_eq!(metrics.uncertain_squares, 0);
    }
}
