use super::{EngineError, EngineOptions, Evaluator, SearchLimit};
use rbc_core::model::{Move, Position};
use rbc_core::rules::{RulesOracle, StandardRules};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{Level, event};

/// Node searches have no wall-clock budget of their own; this bounds the wait.
const NODE_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A UCI engine running as a child process.
///
/// Engine stdout is pumped by a reader thread into a channel so that every wait can be
/// bounded with `recv_timeout`.
pub struct UciEngine {
    name: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    grace: Duration,
    handshake: Duration,
}

impl UciEngine {
    pub fn spawn(path: &Path, options: &EngineOptions) -> Result<Self, EngineError> {
        let mut cmd = Command::new(path);
        if !options.args.is_empty() {
            cmd.args(&options.args);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|err| EngineError::Spawn(format!("{}: {err}", path.display())))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Io("stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Io("stdout".into()))?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("uci-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| EngineError::Spawn(err.to_string()))?;

        let mut engine = Self {
            name: path.display().to_string(),
            child: Some(child),
            stdin: Some(stdin),
            lines: rx,
            reader: Some(reader),
            grace: options.grace(),
            handshake: options.handshake(),
        };

        let deadline = Instant::now() + options.handshake();
        engine.send("uci")?;
        let mut name = None;
        engine.wait_for(deadline, |line| {
            if let Some(rest) = line.strip_prefix("id name ") {
                name = Some(rest.trim().to_string());
            }
            line.trim() == "uciok"
        })?;
        if let Some(name) = name {
            engine.name = name;
        }
        engine.send("isready")?;
        engine.wait_for(deadline, |line| line.trim() == "readyok")?;

        event!(
            target: "rbc_bot::engine",
            Level::INFO,
            engine = %engine.name,
            "engine ready"
        );
        Ok(engine)
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Terminated)?;
        writeln!(stdin, "{command}")
            .and_then(|_| stdin.flush())
            .map_err(|err| EngineError::Io(err.to_string()))
    }

    /// Consumes output lines until `done` accepts one, returning that line.
    fn wait_for<F>(&mut self, deadline: Instant, mut done: F) -> Result<String, EngineError>
    where
        F: FnMut(&str) -> bool,
    {
        let started = Instant::now();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    if done(&line) {
                        return Ok(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(EngineError::Timeout(started.elapsed()));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(EngineError::Terminated),
            }
        }
    }

    /// Waits for `readyok`, dropping anything the engine still had queued from an earlier
    /// request. An engine that never gets back in sync is abandoned.
    fn synchronize(&mut self) -> Result<(), EngineError> {
        self.send("isready")?;
        let deadline = Instant::now() + self.grace + self.handshake;
        let name = self.name.clone();
        let synced = self.wait_for(deadline, |line| {
            if line.starts_with("bestmove") {
                event!(
                    target: "rbc_bot::engine",
                    Level::DEBUG,
                    engine = %name,
                    stale = line,
                    "dropping answer to an abandoned search"
                );
            }
            line.trim() == "readyok"
        });
        if let Err(err) = synced {
            event!(
                target: "rbc_bot::engine",
                Level::WARN,
                engine = %self.name,
                error = %err,
                "engine lost sync; shutting it down"
            );
            self.shutdown();
            return Err(err);
        }
        Ok(())
    }

    fn go_command(limit: SearchLimit, restrict: Option<&[Move]>) -> String {
        let mut command = match limit {
            SearchLimit::Time(budget) => format!("go movetime {}", budget.as_millis().max(1)),
            SearchLimit::Nodes(nodes) => format!("go nodes {nodes}"),
        };
        if let Some(moves) = restrict {
            if !moves.is_empty() {
                command.push_str(" searchmoves");
                for mv in moves {
                    command.push(' ');
                    command.push_str(&mv.uci());
                }
            }
        }
        command
    }
}

pub(crate) fn parse_bestmove(line: &str) -> Result<Move, EngineError> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return Err(EngineError::Protocol(format!("unexpected line {line:?}")));
    }
    match tokens.next() {
        None | Some("(none)") | Some("0000") => Err(EngineError::NoMove),
        Some(text) => text
            .parse::<Move>()
            .map_err(|err| EngineError::Protocol(err.to_string())),
    }
}

impl Evaluator for UciEngine {
    fn best_move(
        &mut self,
        position: &Position,
        limit: SearchLimit,
        restrict: Option<&[Move]>,
    ) -> Result<Move, EngineError> {
        // Engines may crash on boards without both kings, so those never reach the process.
        if !StandardRules.is_engine_safe(position) {
            return Err(EngineError::UnsafePosition(position.to_fen()));
        }
        self.synchronize()?;
        self.send(&format!("position fen {}", position.to_fen()))?;
        self.send(&Self::go_command(limit, restrict))?;

        let budget = match limit {
            SearchLimit::Time(budget) => budget,
            SearchLimit::Nodes(_) => NODE_SEARCH_TIMEOUT,
        };
        let started = Instant::now();
        let deadline = started + budget + self.grace;
        match self.wait_for(deadline, |line| line.starts_with("bestmove")) {
            Ok(line) => parse_bestmove(&line),
            Err(EngineError::Timeout(_)) => {
                event!(
                    target: "rbc_bot::engine",
                    Level::WARN,
                    engine = %self.name,
                    budget_ms = budget.as_millis() as u64,
                    "search overran its budget; stopping"
                );
                self.send("stop")?;
                let drain_deadline = Instant::now() + self.grace;
                match self.wait_for(drain_deadline, |line| line.starts_with("bestmove")) {
                    Ok(_) | Err(EngineError::Timeout(_)) => {
                        Err(EngineError::Timeout(started.elapsed()))
                    }
                    Err(other) => Err(other),
                }
            }
            Err(other) => Err(other),
        }
    }

    fn shutdown(&mut self) {
        if self.child.is_none() {
            return;
        }
        let _ = self.send("quit");
        self.stdin = None;

        if let Some(mut child) = self.child.take() {
            let deadline = Instant::now() + self.grace;
            loop {
                match child.try_wait() {
                    Ok(Some(_)) => break,
                    Ok(None) if Instant::now() < deadline => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    _ => {
                        let _ = child.kill();
                        let _ = child.wait();
                        break;
                    }
                }
            }
        }
        // The reader exits on EOF; it is only joined when that already happened.
        if let Some(reader) = self.reader.take() {
            if reader.is_finished() {
                let _ = reader.join();
            }
        }
        event!(
            target: "rbc_bot::engine",
            Level::DEBUG,
            engine = %self.name,
            "engine shut down"
        );
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
