use rand::Rng;
use rand::seq::SliceRandom;
use rbc_core::belief::BeliefSet;
use rbc_core::model::{Color, Move, Square};
use std::collections::BTreeSet;
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseReason {
    /// Look where our piece was just taken.
    CaptureSquare,
    /// Look where the move we are about to make would land.
    ProvisionalMove,
    Random,
    NoSense,
}

impl SenseReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            SenseReason::CaptureSquare => "capture_square",
            SenseReason::ProvisionalMove => "provisional_move",
            SenseReason::Random => "random",
            SenseReason::NoSense => "no_sense",
        }
    }
}

/// What the sense selector needs to know about the turn.
pub struct SenseContext<'a> {
    pub allowed: &'a [Square],
    pub beliefs: &'a BeliefSet,
    pub own_color: Color,
    pub last_capture: Option<Square>,
    pub provisional: Option<Move>,
}

#[derive(Debug, Clone, Copy)]
pub struct SenseSelector {
    avoid_edges: bool,
}

impl Default for SenseSelector {
    fn default() -> Self {
        Self { avoid_edges: true }
    }
}

impl SenseSelector {
    pub fn new(avoid_edges: bool) -> Self {
        Self { avoid_edges }
    }

    pub fn choose<G: Rng + ?Sized>(
        &self,
        ctx: &SenseContext<'_>,
        rng: &mut G,
    ) -> (Option<Square>, SenseReason) {
        let decision = self.decide(ctx, rng);
        if tracing::enabled!(Level::INFO) {
            event!(
                target: "rbc_bot::sense",
                Level::INFO,
                color = %ctx.own_color,
                beliefs = ctx.beliefs.len(),
                allowed = ctx.allowed.len(),
                chosen = decision.0.map(|sq| sq.to_string()),
                reason = decision.1.as_str(),
            );
        }
        decision
    }

    fn decide<G: Rng + ?Sized>(
        &self,
        ctx: &SenseContext<'_>,
        rng: &mut G,
    ) -> (Option<Square>, SenseReason) {
        let allowed: BTreeSet<Square> = ctx.allowed.iter().copied().collect();
        if allowed.is_empty() {
            return (None, SenseReason::NoSense);
        }

        if let Some(square) = ctx.last_capture.filter(|sq| allowed.contains(sq)) {
            return (Some(square), SenseReason::CaptureSquare);
        }

        if let Some(target) = ctx.provisional.map(|mv| mv.to) {
            let occupied_somewhere = ctx.beliefs.iter().any(|p| p.is_occupied(target));
            if occupied_somewhere && allowed.contains(&target) {
                return (Some(target), SenseReason::ProvisionalMove);
            }
        }

        let without_own: Vec<Square> = allowed
            .iter()
            .copied()
            .filter(|sq| {
                !ctx.beliefs
                    .iter()
                    .any(|p| p.piece_at(*sq).is_some_and(|pc| pc.color == ctx.own_color))
            })
            .collect();
        let interior: Vec<Square> = without_own
            .iter()
            .copied()
            .filter(|sq| !sq.is_edge())
            .collect();

        let pool: Vec<Square> = if self.avoid_edges && !interior.is_empty() {
            interior
        } else if !without_own.is_empty() {
            without_own
        } else {
            allowed.into_iter().collect()
        };
        match pool.choose(rng) {
            Some(square) => (Some(*square), SenseReason::Random),
            None => (None, SenseReason::NoSense),
        }
    }
}
