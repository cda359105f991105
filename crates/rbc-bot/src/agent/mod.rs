//! Agents at the game boundary.
//!
//! A game driver calls the [`Agent`] hooks in turn order: opponent move result, sense
//! choice, sense result, move choice, move result. Every choice returns something usable
//! (possibly `None`) even when the engine is down or the beliefs contradict.

mod belief;
mod params;
mod random;
mod single;

pub use belief::BeliefAgent;
pub use params::{AgentKind, AgentParams};
pub use random::RandomAgent;
pub use single::SingleBoardAgent;

use crate::engine::{EngineOptions, Evaluator};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rbc_core::belief::BeliefSet;
use rbc_core::model::{Color, Move, MoveResult, Position, SensingWindow, Square};
use serde::{Deserialize, Serialize};

pub trait Agent: Send {
    fn name(&self) -> &str;

    fn handle_game_start(&mut self, color: Color, board: &Position);

    /// `capture_square` is only meaningful when `captured` is true.
    fn handle_opponent_move_result(&mut self, captured: bool, capture_square: Option<Square>);

    fn choose_sense(
        &mut self,
        sense_actions: &[Square],
        move_actions: &[Move],
        seconds_left: f64,
    ) -> Option<Square>;

    fn handle_sense_result(&mut self, window: &SensingWindow);

    fn choose_move(&mut self, move_actions: &[Move], seconds_left: f64) -> Option<Move>;

    fn handle_move_result(&mut self, result: &MoveResult);

    fn handle_game_end(&mut self, winner: Option<Color>, reason: &str);

    /// Current belief set, for agents that keep one.
    fn beliefs(&self) -> Option<&BeliefSet> {
        None
    }
}

/// Everything needed to build an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent: AgentParams,
    pub engine: EngineOptions,
}

/// Engine-backed agents search twice a turn: once to aim the sense, once to move.
pub(crate) const SEARCHES_PER_TURN: usize = 2;

pub fn build_agent(config: &AgentConfig, engine: Box<dyn Evaluator>) -> Box<dyn Agent> {
    match config.agent.kind {
        AgentKind::Belief => Box::new(BeliefAgent::new(
            config.agent.clone(),
            config.engine.clone(),
            engine,
        )),
        AgentKind::Single => Box::new(SingleBoardAgent::new(
            config.agent.clone(),
            config.engine.clone(),
            engine,
        )),
        AgentKind::Random => Box::new(RandomAgent::new(config.agent.seed)),
    }
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}
