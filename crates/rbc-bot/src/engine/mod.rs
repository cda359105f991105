//! Evaluation-engine seam.
//!
//! Agents only talk to an [`Evaluator`]. [`UciEngine`] drives an external UCI process such
//! as Stockfish; [`Unavailable`] stands in when no engine is configured so that move
//! selection degrades to its fallback instead of failing.

mod uci;

pub use uci::UciEngine;

use rbc_core::model::{Move, Position};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{Level, event};

pub const STOCKFISH_ENV_VAR: &str = "STOCKFISH_EXECUTABLE";

/// How long (or how far) one engine request may search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Time(Duration),
    Nodes(u64),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no engine configured")]
    Unavailable,
    #[error("failed to spawn engine: {0}")]
    Spawn(String),
    #[error("engine I/O error: {0}")]
    Io(String),
    #[error("engine protocol error: {0}")]
    Protocol(String),
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("engine process terminated")]
    Terminated,
    #[error("engine found no move")]
    NoMove,
    #[error("position cannot be searched: {0}")]
    UnsafePosition(String),
}

pub trait Evaluator: Send {
    /// Best move for the side to move in `position`, optionally restricted to `restrict`.
    fn best_move(
        &mut self,
        position: &Position,
        limit: SearchLimit,
        restrict: Option<&[Move]>,
    ) -> Result<Move, EngineError>;

    /// Releases the engine. Calling it more than once is harmless.
    fn shutdown(&mut self) {}

    fn name(&self) -> &str {
        "engine"
    }
}

/// Evaluator used when no engine is configured; every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl Evaluator for Unavailable {
    fn best_move(
        &mut self,
        _position: &Position,
        _limit: SearchLimit,
        _restrict: Option<&[Move]>,
    ) -> Result<Move, EngineError> {
        Err(EngineError::Unavailable)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Engine process and search budget settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub path: Option<PathBuf>,
    pub args: Vec<String>,
    /// Upper bound for one search.
    pub move_time_ms: u64,
    /// Lower bound for one search, however short the clock gets.
    pub min_move_time_ms: u64,
    /// Fixed node budget; replaces the time budget when set.
    pub nodes: Option<u64>,
    /// Extra wait after the budget before a search counts as timed out.
    pub grace_ms: u64,
    pub handshake_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            path: None,
            args: Vec::new(),
            move_time_ms: 500,
            min_move_time_ms: 50,
            nodes: None,
            grace_ms: 1_000,
            handshake_ms: 5_000,
        }
    }
}

impl EngineOptions {
    /// Configured path, falling back to `STOCKFISH_EXECUTABLE`.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        self.resolve_path_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_path_with<F>(&self, mut read: F) -> Option<PathBuf>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.path.clone().or_else(|| {
            read(STOCKFISH_ENV_VAR)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .map(PathBuf::from)
        })
    }

    /// Per-request budget: `min(move_time, seconds_left * fraction / requests)`, never
    /// below `min_move_time`. A node budget, when configured, wins.
    pub fn limit_for(&self, seconds_left: f64, time_fraction: f64, requests: usize) -> SearchLimit {
        if let Some(nodes) = self.nodes {
            return SearchLimit::Nodes(nodes);
        }
        let requests = requests.max(1) as f64;
        let share_ms = if seconds_left.is_finite() && seconds_left > 0.0 {
            seconds_left * time_fraction.max(0.0) * 1000.0 / requests
        } else {
            0.0
        };
        let capped = share_ms.min(self.move_time_ms as f64);
        let ms = capped.max(self.min_move_time_ms as f64).round() as u64;
        SearchLimit::Time(Duration::from_millis(ms))
    }

    /// Budget for one request when there is no game clock.
    pub fn fixed_limit(&self) -> SearchLimit {
        match self.nodes {
            Some(nodes) => SearchLimit::Nodes(nodes),
            None => SearchLimit::Time(Duration::from_millis(self.move_time_ms.max(1))),
        }
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn handshake(&self) -> Duration {
        Duration::from_millis(self.handshake_ms)
    }
}

/// Starts the configured engine, or returns [`Unavailable`] when there is none or it
/// cannot be started.
pub fn connect(options: &EngineOptions) -> Box<dyn Evaluator> {
    let Some(path) = options.resolve_path() else {
        event!(
            target: "rbc_bot::engine",
            Level::WARN,
            "no engine path configured; moves will use the random fallback"
        );
        return Box::new(Unavailable);
    };
    match UciEngine::spawn(&path, options) {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            event!(
                target: "rbc_bot::engine",
                Level::WARN,
                path = %path.display(),
                error = %err,
                "engine failed to start; moves will use the random fallback"
            );
            Box::new(Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_budget_is_clamped() {
        let options = EngineOptions::default();
        assert_eq!(
            options.limit_for(900.0, 0.05, 5),
            SearchLimit::Time(Duration::from_millis(500))
        );
        assert_eq!(
            options.limit_for(10.0, 0.05, 5),
            SearchLimit::Time(Duration::from_millis(100))
        );
        assert_eq!(
            options.limit_for(0.5, 0.05, 5),
            SearchLimit::Time(Duration::from_millis(50))
        );
        assert_eq!(
            options.limit_for(f64::NAN, 0.05, 5),
            SearchLimit::Time(Duration::from_millis(50))
        );
    }

    #[test]
    fn node_budget_overrides_time() {
        let options = EngineOptions {
            nodes: Some(20_000),
            ..EngineOptions::default()
        };
        assert_eq!(options.limit_for(900.0, 0.05, 5), SearchLimit::Nodes(20_000));
    }

    #[test]
    fn path_falls_back_to_stockfish_variable() {
        let options = EngineOptions::default();
        let resolved = options.resolve_path_with(|key| {
            (key == STOCKFISH_ENV_VAR).then(|| "/opt/stockfish".to_string())
        });
        assert_eq!(resolved, Some(PathBuf::from("/opt/stockfish")));
        assert_eq!(options.resolve_path_with(|_| Some("  ".to_string())), None);

        let explicit = EngineOptions {
            path: Some(PathBuf::from("/usr/bin/sf")),
            ..EngineOptions::default()
        };
        assert_eq!(
            explicit.resolve_path_with(|_| Some("/opt/stockfish".to_string())),
            Some(PathBuf::from("/usr/bin/sf"))
        );
    }

    #[test]
    fn unavailable_always_fails() {
        let mut engine = Unavailable;
        let result = engine.best_move(
            &Position::starting(),
            SearchLimit::Nodes(1),
            None,
        );
        assert!(matches!(result, Err(EngineError::Unavailable)));
        engine.shutdown();
        engine.shutdown();
    }
}
