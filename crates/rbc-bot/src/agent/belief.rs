use super::{Agent, AgentParams, SEARCHES_PER_TURN, seeded_rng};
use crate::engine::{EngineOptions, Evaluator};
use crate::select::{MoveSelector, SenseContext, SenseSelector};
use rand::rngs::SmallRng;
use rbc_core::belief::{BeliefMetrics, BeliefSet, Propagator, SensingFilter};
use rbc_core::model::{Color, Move, MoveResult, Position, SensingWindow, Square};
use tracing::{Level, event};

/// Tracks every position consistent with what it has seen and votes over a sample of them.
pub struct BeliefAgent {
    params: AgentParams,
    engine_options: EngineOptions,
    engine: Box<dyn Evaluator>,
    propagator: Propagator,
    filter: SensingFilter,
    sense: SenseSelector,
    mover: MoveSelector,
    rng: SmallRng,
    color: Color,
    beliefs: BeliefSet,
    /// Generation before the last opponent-move expansion, kept for recovery.
    previous: Option<BeliefSet>,
    last_capture: Option<Square>,
}

impl BeliefAgent {
    pub fn new(
        params: AgentParams,
        engine_options: EngineOptions,
        engine: Box<dyn Evaluator>,
    ) -> Self {
        Self {
            propagator: Propagator::new(params.limits()),
            filter: SensingFilter::new(params.recovery_width),
            sense: SenseSelector::new(params.avoid_edge_sensing),
            mover: MoveSelector::new(params.sample_size),
            rng: seeded_rng(params.seed),
            params,
            engine_options,
            engine,
            color: Color::White,
            beliefs: BeliefSet::singleton(Position::starting()),
            previous: None,
            last_capture: None,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    fn provisional_move(&mut self, move_actions: &[Move], seconds_left: f64) -> Option<Move> {
        if self.beliefs.is_empty() || move_actions.is_empty() {
            return None;
        }
        self.vote(move_actions, seconds_left)
    }

    /// One full sample vote. Both of a turn's votes share the turn's clock share.
    fn vote(&mut self, move_actions: &[Move], seconds_left: f64) -> Option<Move> {
        let limit = self.engine_options.limit_for(
            seconds_left,
            self.params.time_fraction,
            SEARCHES_PER_TURN * self.mover.sample_size(),
        );
        self.mover
            .choose(
                self.propagator.rules(),
                &self.beliefs,
                move_actions,
                self.engine.as_mut(),
                limit,
                &mut self.rng,
            )
            .chosen
    }

    /// Rebuilds a belief set after a capture report no member can explain.
    fn recover_from_capture(&mut self, to_advance: &BeliefSet, square: Option<Square>) -> BeliefSet {
        let any_capture = self
            .propagator
            .advance(to_advance, true, None, &mut self.rng);
        let rebuilt = if any_capture.is_empty() {
            self.propagator.no_information(to_advance)
        } else {
            any_capture
        };
        let rebuilt: BeliefSet = match square {
            Some(square) => rebuilt
                .iter()
                .map(|position| {
                    let mut position = position.clone();
                    if position
                        .piece_at(square)
                        .is_some_and(|piece| piece.color == self.color)
                    {
                        position.set_piece(square, None);
                    }
                    position
                })
                .collect(),
            None => rebuilt,
        };
        event!(
            target: "rbc_core::belief",
            Level::WARN,
            event = "belief_contradiction",
            stage = "opponent_move",
            capture_square = square.map(|sq| sq.to_string()),
            before = to_advance.len(),
            after = rebuilt.len(),
        );
        rebuilt
    }

    fn log_beliefs(&self, stage: &'static str) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        let metrics = BeliefMetrics::from_beliefs(&self.beliefs);
        event!(
            target: "rbc_bot::agent",
            Level::DEBUG,
            stage,
            color = %self.color,
            beliefs = metrics.size,
            uncertain_squares = metrics.uncertain_squares,
            both_kings_ratio = metrics.both_kings_ratio,
        );
    }
}

impl Agent for BeliefAgent {
    fn name(&self) -> &str {
        "belief"
    }

    fn handle_game_start(&mut self, color: Color, board: &Position) {
        self.color = color;
        self.beliefs = BeliefSet::singleton(board.clone());
        self.previous = None;
        self.last_capture = None;
        self.rng = seeded_rng(self.params.seed);
        event!(
            target: "rbc_bot::agent",
            Level::INFO,
            agent = self.name(),
            color = %color,
            engine = self.engine.name(),
            "game start"
        );
    }

    fn handle_opponent_move_result(&mut self, captured: bool, capture_square: Option<Square>) {
        let capture_square = if captured { capture_square } else { None };
        self.last_capture = capture_square;

        // Members where it is already our turn saw no opponent move (white's first turn).
        let (to_advance, untouched) = self.beliefs.partition_by_turn(self.color.opponent());
        let mut advanced =
            self.propagator
                .advance(&to_advance, captured, capture_square, &mut self.rng);
        if advanced.is_empty() && captured && !to_advance.is_empty() {
            advanced = self.recover_from_capture(&to_advance, capture_square);
        }

        let current = std::mem::take(&mut self.beliefs);
        self.previous = Some(current);
        self.beliefs = advanced.union(untouched);
        self.log_beliefs("opponent_move");
    }

    fn choose_sense(
        &mut self,
        sense_actions: &[Square],
        move_actions: &[Move],
        seconds_left: f64,
    ) -> Option<Square> {
        let provisional = if self.last_capture.is_some() {
            None
        } else {
            self.provisional_move(move_actions, seconds_left)
        };
        let ctx = SenseContext {
            allowed: sense_actions,
            beliefs: &self.beliefs,
            own_color: self.color,
            last_capture: self.last_capture,
            provisional,
        };
        self.sense.choose(&ctx, &mut self.rng).0
    }

    fn handle_sense_result(&mut self, window: &SensingWindow) {
        let outcome =
            self.filter
                .apply(&self.beliefs, window, self.previous.as_ref(), &mut self.rng);
        self.beliefs = outcome.beliefs;
        self.log_beliefs("sense");
    }

    fn choose_move(&mut self, move_actions: &[Move], seconds_left: f64) -> Option<Move> {
        self.vote(move_actions, seconds_left)
    }

    fn handle_move_result(&mut self, result: &MoveResult) {
        let outcome = self.propagator.replay_own_move(&self.beliefs, result);
        self.beliefs = outcome.beliefs;
        self.log_beliefs("own_move");
    }

    fn handle_game_end(&mut self, winner: Option<Color>, reason: &str) {
        self.engine.shutdown();
        event!(
            target: "rbc_bot::agent",
            Level::INFO,
            agent = self.name(),
            color = %self.color,
            winner = winner.map(|color| color.to_string()),
            reason,
            beliefs = self.beliefs.len(),
            "game end"
        );
    }

    fn beliefs(&self) -> Option<&BeliefSet> {
        Some(&self.beliefs)
    }
}
