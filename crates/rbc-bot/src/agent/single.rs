use super::{Agent, AgentParams, SEARCHES_PER_TURN, seeded_rng};
use crate::engine::{EngineOptions, Evaluator};
use crate::select::{SenseContext, SenseSelector};
use rand::rngs::SmallRng;
use rbc_core::belief::{BeliefSet, overlay};
use rbc_core::model::{Color, Move, MoveResult, Position, SensingWindow, Square, chess_move};
use rbc_core::rules::{RulesOracle, StandardRules};
use tracing::{Level, event};

/// Keeps one guess of the board: captures clear squares, sense results overwrite it.
pub struct SingleBoardAgent {
    params: AgentParams,
    engine_options: EngineOptions,
    engine: Box<dyn Evaluator>,
    rules: StandardRules,
    sense: SenseSelector,
    rng: SmallRng,
    color: Color,
    board: Position,
    last_capture: Option<Square>,
}

impl SingleBoardAgent {
    pub fn new(
        params: AgentParams,
        engine_options: EngineOptions,
        engine: Box<dyn Evaluator>,
    ) -> Self {
        Self {
            sense: SenseSelector::new(params.avoid_edge_sensing),
            rng: seeded_rng(params.seed),
            params,
            engine_options,
            engine,
            rules: StandardRules,
            color: Color::White,
            board: Position::starting(),
            last_capture: None,
        }
    }

    pub fn board(&self) -> &Position {
        &self.board
    }

    /// An allowed move taking the opponent king on our board, if one of our pieces attacks it.
    fn king_capture(&self, board: &Position, move_actions: &[Move]) -> Option<Move> {
        let king = board.king_square(self.color.opponent())?;
        let attackers = self.rules.attackers(board, king, self.color);
        let mut candidates: Vec<Move> = move_actions
            .iter()
            .copied()
            .filter(|mv| mv.to == king && attackers.contains(&mv.from))
            .collect();
        chess_move::sort_by_uci(&mut candidates);
        candidates.into_iter().next()
    }
}

impl Agent for SingleBoardAgent {
    fn name(&self) -> &str {
        "single"
    }

    fn handle_game_start(&mut self, color: Color, board: &Position) {
        self.color = color;
        self.board = board.clone();
        self.last_capture = None;
        self.rng = seeded_rng(self.params.seed);
    }

    fn handle_opponent_move_result(&mut self, captured: bool, capture_square: Option<Square>) {
        self.last_capture = if captured { capture_square } else { None };
        if let Some(square) = self.last_capture {
            self.board.set_piece(square, None);
        }
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
            self.choose_move(move_actions, seconds_left)
        };
        let beliefs = BeliefSet::singleton(self.board.clone());
        let ctx = SenseContext {
            allowed: sense_actions,
            beliefs: &beliefs,
            own_color: self.color,
            last_capture: self.last_capture,
            provisional,
        };
        self.sense.choose(&ctx, &mut self.rng).0
    }

    fn handle_sense_result(&mut self, window: &SensingWindow) {
        self.board = overlay(&self.board, window);
    }

    fn choose_move(&mut self, move_actions: &[Move], seconds_left: f64) -> Option<Move> {
        let board = self.board.with_turn(self.color);
        if let Some(capture) = self.king_capture(&board, move_actions) {
            return Some(capture);
        }

        let restriction: Vec<Move> = self
            .rules
            .legal_moves(&board)
            .into_iter()
            .filter(|mv| move_actions.contains(mv))
            .collect();
        if restriction.is_empty() {
            return None;
        }
        if !self.rules.is_engine_safe(&board) {
            event!(
                target: "rbc_bot::engine",
                Level::DEBUG,
                fen = %board,
                "board guess cannot be searched; passing"
            );
            return None;
        }

        let limit = self
            .engine_options
            .limit_for(seconds_left, self.params.time_fraction, SEARCHES_PER_TURN);
        match self.engine.best_move(&board, limit, Some(&restriction)) {
            Ok(mv) if restriction.contains(&mv) => Some(mv),
            Ok(mv) => {
                event!(
                    target: "rbc_bot::engine",
                    Level::WARN,
                    engine = self.engine.name(),
                    returned = %mv,
                    "engine answered outside the allowed moves"
                );
                None
            }
            Err(err) => {
                event!(
                    target: "rbc_bot::engine",
                    Level::WARN,
                    engine = self.engine.name(),
                    error = %err,
                    "engine request failed; passing"
                );
                None
            }
        }
    }

    fn handle_move_result(&mut self, result: &MoveResult) {
        let Some(taken) = result.taken else {
            return;
        };
        let board = self.board.with_turn(self.color);
        match self.rules.apply(&board, taken) {
            Ok(next) => self.board = next,
            Err(err) => event!(
                target: "rbc_bot::agent",
                Level::WARN,
                mv = %taken,
                error = %err,
                "taken move does not fit the board guess"
            ),
        }
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
            "game end"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Unavailable;

    fn agent(color: Color, board: &Position) -> SingleBoardAgent {
        let mut agent = SingleBoardAgent::new(
            AgentParams::default(),
            EngineOptions::default(),
            Box::new(Unavailable),
        );
        agent.handle_game_start(color, board);
        agent
    }

    #[test]
    fn attacked_king_is_taken() {
        let board = Position::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1").unwrap();
        let mut agent = agent(Color::White, &board);
        let moves = StandardRules.pseudo_legal_moves(&board);
        assert_eq!(agent.choose_move(&moves, 60.0), Some("e1e8".parse().unwrap()));
    }

    #[test]
    fn capture_clears_the_square_and_sensing_targets_it() {
        let mut agent = agent(Color::White, &Position::starting());
        agent.handle_opponent_move_result(true, Some("e2".parse().unwrap()));
        assert!(agent.board().piece_at("e2".parse().unwrap()).is_none());

        let squares: Vec<Square> = Square::all().collect();
        assert_eq!(
            agent.choose_sense(&squares, &[], 60.0),
            Some("e2".parse().unwrap())
        );
    }

    #[test]
    fn sense_results_overwrite_the_board() {
        let mut agent = agent(Color::White, &Position::starting());
        let window: SensingWindow = "e7:?;e5:p".parse().unwrap();
        agent.handle_sense_result(&window);
        assert!(agent.board().piece_at("e7".parse().unwrap()).is_none());
        assert!(agent.board().is_occupied("e5".parse().unwrap()));
    }

    #[test]
    fn engine_failure_means_no_move() {
        let mut agent = agent(Color::White, &Position::starting());
        let moves = StandardRules.pseudo_legal_moves(&Position::starting());
        assert_eq!(agent.choose_move(&moves, 60.0), None);
    }

    #[test]
    fn taken_moves_update_the_board() {
        let mut agent = agent(Color::White, &Position::starting());
        agent.handle_move_result(&MoveResult::executed("e2e4".parse().unwrap()));
        assert!(agent.board().is_occupied("e4".parse().unwrap()));
        assert!(agent.board().piece_at("e2".parse().unwrap()).is_none());
    }
}
