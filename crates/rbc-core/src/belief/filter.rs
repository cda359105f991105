//! Pruning the belief set against a sensing window.

use super::BeliefSet;
use crate::model::{Position, SensingWindow};
use rand::Rng;
use tracing::{Level, event};

pub const DEFAULT_RECOVERY_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub beliefs: BeliefSet,
    /// True when no member matched and the set was rebuilt around the observation.
    pub recovered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensingFilter {
    recovery_width: usize,
}

impl Default for SensingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RECOVERY_WIDTH)
    }
}

impl SensingFilter {
    pub fn new(recovery_width: usize) -> Self {
        Self {
            recovery_width: recovery_width.max(1),
        }
    }

    pub fn recovery_width(&self) -> usize {
        self.recovery_width
    }

    /// Keeps the members consistent with `window`.
    ///
    /// If nothing survives, the true board left the set at some point. Candidates are then
    /// rebuilt from `previous` (the generation before the last propagation, advanced by a
    /// pass) together with the unfiltered input, sampled down to the recovery width, and
    /// forced to agree with the window.
    pub fn apply<G: Rng + ?Sized>(
        &self,
        beliefs: &BeliefSet,
        window: &SensingWindow,
        previous: Option<&BeliefSet>,
        rng: &mut G,
    ) -> FilterOutcome {
        let kept = beliefs.retain_consistent(window);
        event!(
            target: "rbc_core::belief",
            Level::DEBUG,
            event = "belief_filter",
            window = %window,
            before = beliefs.len(),
            after = kept.len(),
        );
        if !kept.is_empty() {
            return FilterOutcome {
                beliefs: kept,
                recovered: false,
            };
        }

        let mut candidates = beliefs.clone();
        if let Some(previous) = previous {
            candidates.extend(previous.iter().map(Position::pass));
        }
        if candidates.is_empty() {
            return FilterOutcome {
                beliefs: candidates,
                recovered: false,
            };
        }

        let (sampled, _) = candidates.capped(self.recovery_width, rng);
        let rebuilt: BeliefSet = sampled
            .iter()
            .map(|position| overlay(position, window))
            .collect();

        event!(
            target: "rbc_core::belief",
            Level::WARN,
            event = "belief_contradiction",
            stage = "sense",
            window = %window,
            before = beliefs.len(),
            after = rebuilt.len(),
        );
        FilterOutcome {
            beliefs: rebuilt,
            recovered: true,
        }
    }
}

/// Copy of `position` with every observed square forced to its observed occupant.
pub fn overlay(position: &Position, window: &SensingWindow) -> Position {
    let mut next = position.clone();
    for (square, occupant) in window.iter() {
        next.set_piece(square, occupant.piece());
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::{PropagationLimits, Propagator};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn window(text: &str) -> SensingWindow {
        text.parse().unwrap()
    }

    #[test]
    fn consistent_members_survive_untouched() {
        let filter = SensingFilter::default();
        let propagator = Propagator::new(PropagationLimits::default());
        let mut rng = SmallRng::seed_from_u64(3);
        let replies =
            propagator.advance(&BeliefSet::singleton(Position::starting()), false, None, &mut rng);

        let outcome = filter.apply(&replies, &window("e7:?;e5:?"), None, &mut rng);
        assert!(!outcome.recovered);
        assert_eq!(outcome.beliefs.len(), 1);
        let survivor = outcome.beliefs.iter().next().unwrap();
        assert_eq!(
            survivor.to_fen(),
            "rnbqkbnr/pppp1ppp/4p3/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 2"
        );
        assert!(outcome.beliefs.iter().all(|p| replies.contains(p)));
    }

    #[test]
    fn contradiction_recovers_a_non_empty_set() {
        let filter = SensingFilter::default();
        let mut rng = SmallRng::seed_from_u64(9);
        let beliefs = BeliefSet::singleton(Position::starting());
        let observed = window("e4:p;e7:?");
        let outcome = filter.apply(&beliefs, &observed, None, &mut rng);
        assert!(outcome.recovered);
        assert!(!outcome.beliefs.is_empty());
        assert!(outcome.beliefs.iter().all(|p| observed.is_consistent_with(p)));
    }

    #[test]
    fn recovery_draws_on_the_previous_generation() {
        let filter = SensingFilter::new(4);
        let mut rng = SmallRng::seed_from_u64(11);
        let previous = BeliefSet::singleton(Position::starting().pass());
        let outcome = filter.apply(&BeliefSet::new(), &window("a3:?"), Some(&previous), &mut rng);
        assert!(outcome.recovered);
        assert_eq!(outcome.beliefs.len(), 1);
        assert!(outcome.beliefs.contains(&Position::starting().pass().pass()));
    }

    #[test]
    fn recovery_is_bounded_by_the_width() {
        let filter = SensingFilter::new(3);
        let propagator = Propagator::new(PropagationLimits::default());
        let mut rng = SmallRng::seed_from_u64(5);
        let replies =
            propagator.advance(&BeliefSet::singleton(Position::starting()), false, None, &mut rng);
        let outcome = filter.apply(&replies, &window("d4:n"), None, &mut rng);
        assert!(outcome.recovered);
        assert!(outcome.beliefs.len() <= 3);
    }

    #[test]
    fn nothing_to_recover_from_stays_empty() {
        let filter = SensingFilter::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = filter.apply(&BeliefSet::new(), &window("a3:?"), None, &mut rng);
        assert!(outcome.beliefs.is_empty());
        assert!(!outcome.recovered);
    }

    #[test]
    fn overlay_drops_rights_the_observation_invalidates() {
        let cleared = overlay(&Position::starting(), &window("h1:?"));
        assert!(!cleared.castling().has(
            crate::model::Color::White,
            crate::model::CastleSide::KingSide
        ));
    }
}
