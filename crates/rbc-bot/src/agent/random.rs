use super::{Agent, seeded_rng};
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rbc_core::model::{Color, Move, MoveResult, Position, SensingWindow, Square};

/// Baseline: senses and moves uniformly at random.
pub struct RandomAgent {
    seed: Option<u64>,
    rng: SmallRng,
}

impl RandomAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            rng: seeded_rng(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "random"
    }

    fn handle_game_start(&mut self, _color: Color, _board: &Position) {
        self.rng = seeded_rng(self.seed);
    }

    fn handle_opponent_move_result(&mut self, _captured: bool, _capture_square: Option<Square>) {}

    fn choose_sense(
        &mut self,
        sense_actions: &[Square],
        _move_actions: &[Move],
        _seconds_left: f64,
    ) -> Option<Square> {
        sense_actions.choose(&mut self.rng).copied()
    }

    fn handle_sense_result(&mut self, _window: &SensingWindow) {}

    /// Passing counts as one more option.
    fn choose_move(&mut self, move_actions: &[Move], _seconds_left: f64) -> Option<Move> {
        let pick = self.rng.gen_range(0..=move_actions.len());
        move_actions.get(pick).copied()
    }

    fn handle_move_result(&mut self, _result: &MoveResult) {}

    fn handle_game_end(&mut self, _winner: Option<Color>, _reason: &str) {}
}
