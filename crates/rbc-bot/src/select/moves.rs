use super::MoveTally;
use crate::engine::{EngineError, Evaluator, SearchLimit};
use rand::Rng;
use rand::seq::SliceRandom;
use rbc_core::belief::BeliefSet;
use rbc_core::model::{Move, Position, chess_move::sort_by_uci};
use rbc_core::rules::RulesOracle;
use tracing::{Level, event};

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveReason {
    KingCapture,
    Vote,
    Fallback,
    NoMove,
}

impl MoveReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            MoveReason::KingCapture => "king_capture",
            MoveReason::Vote => "vote",
            MoveReason::Fallback => "fallback",
            MoveReason::NoMove => "no_move",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoveDecision {
    pub chosen: Option<Move>,
    pub reason: MoveReason,
    pub tally: MoveTally,
    /// Sampled beliefs that actually produced a vote.
    pub voters: usize,
}

impl MoveDecision {
    fn without_tally(chosen: Option<Move>, reason: MoveReason) -> Self {
        Self {
            chosen,
            reason,
            tally: MoveTally::new(),
            voters: 0,
        }
    }
}

/// King capture first, then a majority vote of engine answers over sampled beliefs, then a
/// random legal move.
#[derive(Debug, Clone, Copy)]
pub struct MoveSelector {
    sample_size: usize,
}

impl Default for MoveSelector {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

impl MoveSelector {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn choose<R, G>(
        &self,
        rules: &R,
        beliefs: &BeliefSet,
        allowed: &[Move],
        engine: &mut dyn Evaluator,
        limit: SearchLimit,
        rng: &mut G,
    ) -> MoveDecision
    where
        R: RulesOracle,
        G: Rng + ?Sized,
    {
        let decision = self.decide(rules, beliefs, allowed, engine, limit, rng);
        log_move_decision(beliefs, allowed, &decision);
        decision
    }

    fn decide<R, G>(
        &self,
        rules: &R,
        beliefs: &BeliefSet,
        allowed: &[Move],
        engine: &mut dyn Evaluator,
        limit: SearchLimit,
        rng: &mut G,
    ) -> MoveDecision
    where
        R: RulesOracle,
        G: Rng + ?Sized,
    {
        if let Some(capture) = king_capture(rules, beliefs, allowed) {
            return MoveDecision::without_tally(Some(capture), MoveReason::KingCapture);
        }

        let mut tally = MoveTally::new();
        let mut voters = 0;
        for position in beliefs.sample(self.sample_size, rng) {
            let restriction = restricted_legal_moves(rules, &position, allowed);
            if restriction.is_empty() {
                continue;
            }
            if !rules.is_engine_safe(&position) {
                event!(
                    target: "rbc_bot::move",
                    Level::DEBUG,
                    fen = %position,
                    "skipping sample the engine cannot search"
                );
                continue;
            }
            match engine.best_move(&position, limit, Some(&restriction)) {
                Ok(mv) if restriction.contains(&mv) => {
                    tally.vote(mv);
                    voters += 1;
                }
                Ok(mv) => {
                    event!(
                        target: "rbc_bot::engine",
                        Level::WARN,
                        engine = engine.name(),
                        returned = %mv,
                        "engine answered outside the allowed moves; vote discarded"
                    );
                }
                Err(err) => log_engine_failure(engine.name(), &err),
            }
        }

        if let Some((winner, _)) = tally.winner() {
            return MoveDecision {
                chosen: Some(winner),
                reason: MoveReason::Vote,
                tally,
                voters,
            };
        }

        let fallback = beliefs.choose(rng).and_then(|position| {
            restricted_legal_moves(rules, position, allowed)
                .choose(rng)
                .copied()
        });
        let reason = if fallback.is_some() {
            MoveReason::Fallback
        } else {
            MoveReason::NoMove
        };
        MoveDecision {
            chosen: fallback,
            reason,
            tally,
            voters,
        }
    }
}

/// The smallest (by UCI text) allowed move that takes the opponent king in some belief.
pub fn king_capture<R: RulesOracle>(
    rules: &R,
    beliefs: &BeliefSet,
    allowed: &[Move],
) -> Option<Move> {
    let mut candidates = allowed.to_vec();
    sort_by_uci(&mut candidates);
    candidates
        .into_iter()
        .find(|mv| beliefs.iter().any(|position| rules.captures_king(position, *mv)))
}

fn restricted_legal_moves<R: RulesOracle>(
    rules: &R,
    position: &Position,
    allowed: &[Move],
) -> Vec<Move> {
    let mut moves: Vec<Move> = rules
        .legal_moves(position)
        .into_iter()
        .filter(|mv| allowed.contains(mv))
        .collect();
    sort_by_uci(&mut moves);
    moves
}

fn log_engine_failure(engine: &str, err: &EngineError) {
    event!(
        target: "rbc_bot::engine",
        Level::WARN,
        engine,
        error = %err,
        "engine request failed; sample skipped"
    );
}

fn log_move_decision(beliefs: &BeliefSet, allowed: &[Move], decision: &MoveDecision) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    let votes = decision
        .tally
        .ranked()
        .iter()
        .take(4)
        .map(|(mv, n)| format!("{mv}:{n}"))
        .collect::<Vec<_>>()
        .join(",");

    event!(
        target: "rbc_bot::move",
        Level::INFO,
        beliefs = beliefs.len(),
        allowed = allowed.len(),
        voters = decision.voters,
        votes = %votes,
        chosen = decision.chosen.map(|mv| mv.uci()),
        reason = decision.reason.as_str(),
    );
}
