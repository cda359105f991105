//! Belief expansion across moves we cannot see, and replay of moves we made.

use super::BeliefSet;
use crate::model::{Move, MoveResult, Position, Square};
use crate::rules::{RulesOracle, StandardRules};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

pub const DEFAULT_MAX_BELIEFS: usize = 5_000;

/// Growth bounds applied after each expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationLimits {
    /// Largest belief set kept after a propagation step; `None` keeps everything.
    pub max_beliefs: Option<usize>,
}

impl Default for PropagationLimits {
    fn default() -> Self {
        Self {
            max_beliefs: Some(DEFAULT_MAX_BELIEFS),
        }
    }
}

impl PropagationLimits {
    pub fn unbounded() -> Self {
        Self { max_beliefs: None }
    }
}

/// Result of replaying our own move through the belief set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub beliefs: BeliefSet,
    /// True when no belief agreed with the report and the move was forced onto them.
    pub recovered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Propagator<R = StandardRules> {
    rules: R,
    limits: PropagationLimits,
}

impl Propagator<StandardRules> {
    pub fn new(limits: PropagationLimits) -> Self {
        Self {
            rules: StandardRules,
            limits,
        }
    }
}

impl<R: RulesOracle> Propagator<R> {
    pub fn with_rules(rules: R, limits: PropagationLimits) -> Self {
        Self { rules, limits }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn limits(&self) -> PropagationLimits {
        self.limits
    }

    /// Every position reachable by one move of the side to move: pseudo-legal moves,
    /// relaxed castles and the pass. Sorted by FEN, without duplicates.
    pub fn successors(&self, position: &Position) -> Vec<Position> {
        let mut next: BeliefSet = self
            .rules
            .candidate_moves(position)
            .into_iter()
            .filter_map(|mv| self.rules.apply(position, mv).ok())
            .collect();
        next.insert(position.pass());
        sorted_positions(next)
    }

    /// Successors produced by a capture on `square` (any capture when `None`).
    pub fn capture_successors(&self, position: &Position, square: Option<Square>) -> Vec<Position> {
        sorted_positions(self.capture_set(position, square))
    }

    /// Expands the belief set across one unseen opponent move.
    ///
    /// With `captured` set only captures on `capture_square` survive; otherwise only
    /// non-captures and the pass do. The union is capped by [`PropagationLimits`].
    pub fn advance<G: Rng + ?Sized>(
        &self,
        beliefs: &BeliefSet,
        captured: bool,
        capture_square: Option<Square>,
        rng: &mut G,
    ) -> BeliefSet {
        let mut next = BeliefSet::new();
        for position in beliefs {
            if captured {
                next.extend(self.capture_set(position, capture_square));
            } else {
                next.extend(self.quiet_set(position));
            }
        }

        let expanded = next.len();
        let next = match self.limits.max_beliefs {
            Some(max) => {
                let (kept, truncated) = next.capped(max, rng);
                if truncated {
                    event!(
                        target: "rbc_core::belief",
                        Level::DEBUG,
                        event = "belief_cap",
                        expanded,
                        kept = kept.len(),
                    );
                }
                kept
            }
            None => next,
        };

        event!(
            target: "rbc_core::belief",
            Level::DEBUG,
            event = "belief_advance",
            captured,
            capture_square = capture_square.map(|sq| sq.to_string()),
            before = beliefs.len(),
            after = next.len(),
        );
        next
    }

    /// Applies the "nothing is known" transition to every member: the side to move passes.
    pub fn no_information(&self, beliefs: &BeliefSet) -> BeliefSet {
        beliefs.iter().map(Position::pass).collect()
    }

    /// Replays the result of our own move attempt through the belief set.
    ///
    /// Members survive only if the executed move was possible there and produced the same
    /// capture report. When the referee revised the request, members in which the
    /// request would have gone through unchanged are dropped as well.
    pub fn replay_own_move(&self, beliefs: &BeliefSet, result: &MoveResult) -> ReplayOutcome {
        let Some(taken) = result.taken else {
            let kept: BeliefSet = beliefs
                .iter()
                .filter(|position| !self.request_would_execute(position, result))
                .map(Position::pass)
                .collect();
            return self.finish_replay(beliefs, kept, result);
        };

        let reported = if result.captured_opponent_piece {
            result.capture_square
        } else {
            None
        };

        let kept: BeliefSet = beliefs
            .iter()
            .filter(|position| self.rules.candidate_moves(position).contains(&taken))
            .filter(|position| self.capture_matches(position, taken, result, reported))
            .filter(|position| !self.request_would_execute(position, result))
            .filter_map(|position| self.rules.apply(position, taken).ok())
            .collect();
        self.finish_replay(beliefs, kept, result)
    }

    fn finish_replay(
        &self,
        beliefs: &BeliefSet,
        kept: BeliefSet,
        result: &MoveResult,
    ) -> ReplayOutcome {
        if !kept.is_empty() || beliefs.is_empty() {
            return ReplayOutcome {
                beliefs: kept,
                recovered: false,
            };
        }

        let forced: BeliefSet = match result.taken {
            Some(taken) => {
                let applied: BeliefSet = beliefs
                    .iter()
                    .filter(|position| {
                        position
                            .piece_at(taken.from)
                            .is_some_and(|piece| piece.color == position.turn())
                    })
                    .filter_map(|position| self.rules.apply(position, taken).ok())
                    .collect();
                if applied.is_empty() {
                    self.no_information(beliefs)
                } else {
                    applied
                }
            }
            None => self.no_information(beliefs),
        };

        event!(
            target: "rbc_core::belief",
            Level::WARN,
            event = "belief_contradiction",
            stage = "own_move",
            requested = result.requested.map(|mv| mv.uci()),
            taken = result.taken.map(|mv| mv.uci()),
            before = beliefs.len(),
            after = forced.len(),
        );
        ReplayOutcome {
            beliefs: forced,
            recovered: true,
        }
    }

    fn capture_matches(
        &self,
        position: &Position,
        taken: Move,
        result: &MoveResult,
        reported: Option<Square>,
    ) -> bool {
        let actual = self.rules.capture_square(position, taken);
        match (result.captured_opponent_piece, reported) {
            (false, _) => actual.is_none(),
            (true, Some(square)) => actual == Some(square),
            (true, None) => actual.is_some(),
        }
    }

    /// A revised or refused request means the request itself could not run unchanged.
    fn request_would_execute(&self, position: &Position, result: &MoveResult) -> bool {
        match result.requested {
            Some(requested) if result.was_revised() => {
                self.rules.candidate_moves(position).contains(&requested)
            }
            _ => false,
        }
    }

    fn capture_set(&self, position: &Position, square: Option<Square>) -> BeliefSet {
        self.rules
            .candidate_moves(position)
            .into_iter()
            .filter(|mv| {
                let captured_at = self.rules.capture_square(position, *mv);
                match square {
                    Some(target) => captured_at == Some(target),
                    None => captured_at.is_some(),
                }
            })
            .filter_map(|mv| self.rules.apply(position, mv).ok())
            .collect()
    }

    fn quiet_set(&self, position: &Position) -> BeliefSet {
        let mut next: BeliefSet = self
            .rules
            .candidate_moves(position)
            .into_iter()
            .filter(|mv| !self.rules.is_capture(position, *mv))
            .filter_map(|mv| self.rules.apply(position, mv).ok())
            .collect();
        next.insert(position.pass());
        next
    }
}

fn sorted_positions(set: BeliefSet) -> Vec<Position> {
    let mut positions: Vec<Position> = set.into_iter().collect();
    positions.sort_by_cached_key(Position::to_fen);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Color, SensingWindow};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn quiet_advance_from_start_has_twenty_one_members() {
        let propagator = Propagator::new(PropagationLimits::default());
        let start = BeliefSet::singleton(Position::starting());
        let next = propagator.advance(&start, false, None, &mut rng());
        assert_eq!(next.len(), 21);
        assert!(next.contains(&Position::starting().pass()));
        assert!(next.iter().all(|p| p.turn() == Color::Black));
    }

    #[test]
    fn capture_advance_keeps_only_captures_on_the_square() {
        let propagator = Propagator::new(PropagationLimits::default());
        // Black to move; both the knight and the pawn can take on e4.
        let before = position("rnbqkb1r/ppp1pppp/5n2/3p4/4P3/2N5/PPPP1PPP/R1BQKBNR b KQkq - 2 3");
        let next = propagator.advance(&BeliefSet::singleton(before), true, Some(sq("e4")), &mut rng());
        let fens = next.fens();
        assert_eq!(fens.len(), 2);
        assert!(next.iter().all(|p| p.piece_at(sq("e4")).is_some_and(|pc| pc.color == Color::Black)));
    }

    #[test]
    fn capture_advance_uses_the_passed_pawn_square_for_en_passant() {
        let propagator = Propagator::new(PropagationLimits::default());
        let before = position("4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1");
        let next = propagator.advance(&BeliefSet::singleton(before), true, Some(sq("d4")), &mut rng());
        assert_eq!(next.fens(), vec!["4k3/8/8/8/8/3p4/8/4K3 w - - 0 2".to_string()]);
    }

    #[test]
    fn quiet_advance_includes_relaxed_castles() {
        let propagator = Propagator::new(PropagationLimits::default());
        // White rook on f1 would forbid black's kingside castle under standard rules.
        let before = position("r3k2r/8/8/8/8/8/8/4KR2 b kq - 0 1");
        let next = propagator.advance(&BeliefSet::singleton(before), false, None, &mut rng());
        assert!(next.contains(&position("r4rk1/8/8/8/8/8/8/4KR2 w - - 1 2")));
    }

    #[test]
    fn cap_is_applied_and_deterministic() {
        let propagator = Propagator::new(PropagationLimits {
            max_beliefs: Some(5),
        });
        let start = BeliefSet::singleton(Position::starting());
        let a = propagator.advance(&start, false, None, &mut rng());
        let b = propagator.advance(&start, false, None, &mut rng());
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_stays_empty() {
        let propagator = Propagator::new(PropagationLimits::unbounded());
        assert!(propagator.advance(&BeliefSet::new(), false, None, &mut rng()).is_empty());
    }

    #[test]
    fn replay_applies_the_taken_move_where_possible() {
        let propagator = Propagator::new(PropagationLimits::default());
        let with_blocker = position("rnbqkbnr/pppp1ppp/8/8/8/4p3/PPPPPPPP/RNBQKBNR w KQkq - 0 3");
        let beliefs: BeliefSet = [Position::starting(), with_blocker].into_iter().collect();
        let outcome = propagator.replay_own_move(&beliefs, &MoveResult::executed(mv("e2e4")));
        assert!(!outcome.recovered);
        assert_eq!(outcome.beliefs.len(), 1);
        assert_eq!(
            outcome.beliefs.fens(),
            vec!["rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string()]
        );
    }

    #[test]
    fn replay_of_a_refused_move_drops_beliefs_where_it_was_possible() {
        let propagator = Propagator::new(PropagationLimits::default());
        let with_blocker = position("rnbqkbnr/pppp1ppp/8/8/8/4p3/PPPPPPPP/RNBQKBNR w KQkq - 0 3");
        let beliefs: BeliefSet = [Position::starting(), with_blocker.clone()].into_iter().collect();
        let refused = MoveResult {
            requested: Some(mv("e2e4")),
            taken: None,
            captured_opponent_piece: false,
            capture_square: None,
        };
        let outcome = propagator.replay_own_move(&beliefs, &refused);
        assert_eq!(outcome.beliefs.len(), 1);
        assert!(outcome.beliefs.contains(&with_blocker.pass()));
    }

    #[test]
    fn replay_checks_the_capture_report() {
        let propagator = Propagator::new(PropagationLimits::default());
        let pawn_on_d5 = position("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let knight_on_d5 = position("r1bqkbnr/pppppppp/8/3n4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 3 3");
        let beliefs: BeliefSet = [pawn_on_d5, knight_on_d5].into_iter().collect();
        let result = MoveResult::executed(mv("e4d5")).with_capture(sq("d5"));
        let outcome = propagator.replay_own_move(&beliefs, &result);
        assert_eq!(outcome.beliefs.len(), 2);

        let quiet = MoveResult::executed(mv("e4d5"));
        let outcome = propagator.replay_own_move(&beliefs, &quiet);
        assert!(outcome.recovered);
        assert_eq!(outcome.beliefs.len(), 2);
    }

    #[test]
    fn forced_replay_still_reflects_the_move() {
        let propagator = Propagator::new(PropagationLimits::default());
        let beliefs = BeliefSet::singleton(Position::starting());
        let result = MoveResult::executed(mv("e2e4")).with_capture(sq("e4"));
        let outcome = propagator.replay_own_move(&beliefs, &result);
        assert!(outcome.recovered);
        let window: SensingWindow = "e4:P;e2:?".parse().unwrap();
        assert!(outcome.beliefs.iter().all(|p| window.is_consistent_with(p)));
    }

    #[test]
    fn successor_listing_is_sorted_and_unique() {
        let propagator = Propagator::new(PropagationLimits::unbounded());
        let next = propagator.successors(&Position::starting());
        assert_eq!(next.len(), 21);
        let fens: Vec<String> = next.iter().map(Position::to_fen).collect();
        let mut sorted = fens.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(fens, sorted);
    }
}
