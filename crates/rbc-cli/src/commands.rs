//! Single-shot utilities over the belief machinery.
//!
//! Each utility reads its input line by line (FENs, squares, sensing windows) and writes
//! one result per line, or a JSON document when `json` is set.

use anyhow::{Context, Result, anyhow, bail};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rbc_bot::engine::{self, Evaluator};
use rbc_bot::select::MoveSelector;
use rbc_bot::{Agent, build_agent};
use rbc_core::belief::{BeliefSet, BeliefSnapshot, Propagator};
use rbc_core::model::{Color, Move, MoveResult, Position, SensingWindow, Square, chess_move};
use rbc_core::rules::{RulesOracle, StandardRules};
use serde::Serialize;
use serde_json::json;
use std::io::{BufRead, Lines, Write};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utility {
    /// FEN → eight-line board dump.
    Board,
    /// FEN → every pseudo-legal move, the relaxed castles and the null move.
    Moves,
    /// FEN and move → the resulting FEN, or `Illegal move`.
    Apply,
    /// FEN → every position one move later, including the pass.
    NextStates,
    /// FEN and square → positions after a capture on that square.
    CaptureStates,
    /// Count, FENs and a sensing window → the FENs that agree with the window.
    Filter,
    /// Count and FENs (or one bare FEN) → one move chosen across all of them.
    ChooseMove,
    /// Agent color, then opponent moves → one line per agent turn of a local game.
    Play,
}

/// Clock reported to the agent on every turn of a local game.
const LOCAL_CLOCK_SECONDS: f64 = 900.0;

struct InputLines<R> {
    lines: Lines<R>,
}

impl<R: BufRead> InputLines<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    fn next(&mut self, what: &str) -> Result<String> {
        match self.lines.next() {
            Some(line) => Ok(line
                .with_context(|| format!("reading {what}"))?
                .trim()
                .to_string()),
            None => bail!("input ended before {what}"),
        }
    }

    fn position(&mut self) -> Result<Position> {
        let fen = self.next("FEN")?;
        Position::from_fen(&fen).with_context(|| format!("parsing FEN {fen:?}"))
    }

    /// Next non-blank line, or `None` once the input is exhausted.
    fn next_optional(&mut self, what: &str) -> Result<Option<String>> {
        for line in self.lines.by_ref() {
            let line = line.with_context(|| format!("reading {what}"))?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
        Ok(None)
    }

    fn positions(&mut self) -> Result<BeliefSet> {
        let raw = self.next("position count")?;
        let count = raw
            .parse::<usize>()
            .with_context(|| format!("parsing position count {raw:?}"))?;
        (0..count).map(|_| self.position()).collect()
    }

    /// Either a count followed by that many FENs, or a single bare FEN.
    fn positions_or_fen(&mut self) -> Result<BeliefSet> {
        let first = self.next("position count or FEN")?;
        match first.parse::<usize>() {
            Ok(count) => (0..count).map(|_| self.position()).collect(),
            Err(_) => {
                let position = Position::from_fen(&first)
                    .with_context(|| format!("parsing FEN {first:?}"))?;
                Ok(BeliefSet::singleton(position))
            }
        }
    }
}

pub fn run_utility<R, W>(
    utility: Utility,
    config: &Config,
    json: bool,
    input: R,
    output: &mut W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut input = InputLines::new(input);
    let propagator = Propagator::new(config.agent.limits());
    match utility {
        Utility::Board => {
            let position = input.position()?;
            writeln!(output, "{}", position.board_string())?;
        }
        Utility::Moves => {
            let position = input.position()?;
            let mut moves: Vec<String> = StandardRules
                .candidate_moves(&position)
                .into_iter()
                .map(|mv| mv.uci())
                .collect();
            moves.push(Move::NULL.uci());
            moves.sort();
            moves.dedup();
            if json {
                writeln!(output, "{}", serde_json::to_string_pretty(&moves)?)?;
            } else {
                write_lines(output, &moves)?;
            }
        }
        Utility::Apply => {
            let position = input.position()?;
            let raw = input.next("move")?;
            let rules = StandardRules;
            let next = match raw.parse::<Move>() {
                Ok(mv) if rules.legal_moves(&position).contains(&mv) => {
                    Some(rules.apply(&position, mv)?)
                }
                _ => None,
            };
            if json {
                let document = json!({
                    "move": raw,
                    "legal": next.is_some(),
                    "fen": next.as_ref().map(Position::to_fen),
                });
                writeln!(output, "{}", serde_json::to_string_pretty(&document)?)?;
            } else {
                match next {
                    Some(position) => writeln!(output, "{position}")?,
                    None => writeln!(output, "Illegal move")?,
                }
            }
        }
        Utility::NextStates => {
            let position = input.position()?;
            let next: BeliefSet = propagator.successors(&position).into_iter().collect();
            write_beliefs(output, &next, json)?;
        }
        Utility::CaptureStates => {
            let position = input.position()?;
            let raw = input.next("capture square")?;
            let square: Square = raw
                .to_ascii_lowercase()
                .parse()
                .with_context(|| format!("parsing capture square {raw:?}"))?;
            let next: BeliefSet = propagator
                .capture_successors(&position, Some(square))
                .into_iter()
                .collect();
            write_beliefs(output, &next, json)?;
        }
        Utility::Filter => {
            let beliefs = input.positions()?;
            let raw = input.next("sensing window")?;
            let window: SensingWindow = raw
                .parse()
                .with_context(|| format!("parsing sensing window {raw:?}"))?;
            write_beliefs(output, &beliefs.retain_consistent(&window), json)?;
        }
        Utility::ChooseMove => {
            let beliefs = input.positions_or_fen()?;
            if beliefs.is_empty() {
                return Err(anyhow!("no positions to choose a move for"));
            }
            let mut evaluator = engine::connect(&config.engine);
            let result = choose_move(config, &beliefs, evaluator.as_mut(), json, output);
            evaluator.shutdown();
            result?;
        }
        Utility::Play => {
            let raw = input.next("agent color")?;
            let color: Color = raw
                .parse()
                .with_context(|| format!("parsing agent color {raw:?}"))?;
            let mut agent = build_agent(&config.agent_config(), engine::connect(&config.engine));
            let report = play_local_game(agent.as_mut(), color, &mut input)?;
            if json {
                writeln!(output, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                for turn in &report.turns {
                    writeln!(output, "{turn}")?;
                }
                let winner = report.winner.map_or_else(|| "none".to_string(), |c| c.to_string());
                writeln!(output, "winner={winner} reason={}", report.reason)?;
            }
        }
    }
    output.flush()?;
    Ok(())
}

fn choose_move<W: Write>(
    config: &Config,
    beliefs: &BeliefSet,
    evaluator: &mut dyn Evaluator,
    json: bool,
    output: &mut W,
) -> Result<()> {
    let rules = StandardRules;
    let mut allowed: Vec<Move> = beliefs
        .iter()
        .flat_map(|position| rules.candidate_moves(position))
        .collect();
    chess_move::sort_by_uci(&mut allowed);
    allowed.dedup();

    let mut rng = match config.agent.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let decision = MoveSelector::new(config.agent.sample_size).choose(
        &rules,
        beliefs,
        &allowed,
        evaluator,
        config.engine.fixed_limit(),
        &mut rng,
    );

    if json {
        let votes: Vec<_> = decision
            .tally
            .ranked()
            .into_iter()
            .map(|(mv, count)| json!({ "move": mv.uci(), "votes": count }))
            .collect();
        let document = json!({
            "move": decision.chosen.map(|mv| mv.uci()),
            "reason": decision.reason.as_str(),
            "engine": evaluator.name(),
            "voters": decision.voters,
            "votes": votes,
        });
        writeln!(output, "{}", serde_json::to_string_pretty(&document)?)?;
    } else if let Some(mv) = decision.chosen {
        writeln!(output, "{mv}")?;
    }
    Ok(())
}

/// One of the agent's turns in a local game.
#[derive(Debug, Serialize)]
struct TurnRecord {
    turn: usize,
    sense: Option<Square>,
    requested: Option<Move>,
    taken: Option<Move>,
    capture: Option<Square>,
    /// Belief set size after the move, for agents that keep one.
    beliefs: Option<usize>,
}

impl std::fmt::Display for TurnRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn or_dash<T: ToString>(value: Option<T>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "{} sense={} move={} taken={} capture={} beliefs={}",
            self.turn,
            or_dash(self.sense),
            or_dash(self.requested),
            or_dash(self.taken),
            or_dash(self.capture),
            or_dash(self.beliefs),
        )
    }
}

#[derive(Debug, Serialize)]
struct GameReport {
    agent: String,
    color: Color,
    winner: Option<Color>,
    reason: &'static str,
    turns: Vec<TurnRecord>,
}

/// Plays the agent from the standard start against opponent moves read from `input`.
///
/// The true board is known here, so sensing windows and capture reports are exact. A
/// requested move outside the offered moves is not executed. The game ends when a king is
/// taken or the opponent's moves run out; `0000` is an opponent pass.
fn play_local_game<R: BufRead>(
    agent: &mut dyn Agent,
    color: Color,
    input: &mut InputLines<R>,
) -> Result<GameReport> {
    let rules = StandardRules;
    let squares: Vec<Square> = Square::all().collect();
    let mut truth = Position::starting();
    let mut opponent_capture: Option<Square> = None;
    let mut turns = Vec::new();
    agent.handle_game_start(color, &truth);

    let winner = loop {
        if truth.turn() == color {
            agent.handle_opponent_move_result(opponent_capture.is_some(), opponent_capture);
            let moves = rules.candidate_moves(&truth);
            let sense = agent.choose_sense(&squares, &moves, LOCAL_CLOCK_SECONDS);
            if let Some(square) = sense {
                agent.handle_sense_result(&SensingWindow::observe(&truth, square));
            }

            let requested = agent.choose_move(&moves, LOCAL_CLOCK_SECONDS);
            let taken = requested.filter(|mv| moves.contains(mv));
            let capture = taken.and_then(|mv| rules.capture_square(&truth, mv));
            let king_taken = taken.is_some_and(|mv| rules.captures_king(&truth, mv));
            let result = MoveResult {
                requested,
                taken,
                captured_opponent_piece: capture.is_some(),
                capture_square: capture,
            };
            truth = match taken {
                Some(mv) => rules.apply(&truth, mv)?,
                None => truth.pass(),
            };
            agent.handle_move_result(&result);
            turns.push(TurnRecord {
                turn: turns.len() + 1,
                sense,
                requested,
                taken,
                capture,
                beliefs: agent.beliefs().map(BeliefSet::len),
            });
            if king_taken {
                break Some(color);
            }
        } else {
            let Some(raw) = input.next_optional("opponent move")? else {
                break None;
            };
            let mv: Move = raw
                .parse()
                .with_context(|| format!("parsing opponent move {raw:?}"))?;
            if mv == Move::NULL {
                opponent_capture = None;
                truth = truth.pass();
                continue;
            }
            if !rules.candidate_moves(&truth).contains(&mv) {
                bail!("opponent move {mv} is not possible in {truth}");
            }
            let king_taken = rules.captures_king(&truth, mv);
            opponent_capture = rules.capture_square(&truth, mv);
            truth = rules.apply(&truth, mv)?;
            if king_taken {
                break Some(!color);
            }
        }
    };

    let reason = if winner.is_some() {
        "king captured"
    } else {
        "opponent moves exhausted"
    };
    agent.handle_game_end(winner, reason);
    Ok(GameReport {
        agent: agent.name().to_string(),
        color,
        winner,
        reason,
        turns,
    })
}

fn write_beliefs<W: Write>(output: &mut W, beliefs: &BeliefSet, json: bool) -> Result<()> {
    if json {
        writeln!(output, "{}", BeliefSnapshot::to_json(beliefs)?)?;
    } else {
        write_lines(output, &beliefs.fens())?;
    }
    Ok(())
}

fn write_lines<W: Write>(output: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(output, "{line}")?;
    }
    Ok(())
}
