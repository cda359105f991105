use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rbc_cli::commands::{Utility, run_utility};
use rbc_cli::config::Config;
use rbc_cli::logging::init_logging;
use tracing::{Level, event};

/// Belief-state utilities for Reconnaissance Blind Chess.
#[derive(Debug, Parser)]
#[command(
    name = "rbc",
    author,
    version,
    about = "Belief tracking and move selection for Reconnaissance Blind Chess"
)]
struct Cli {
    /// Path to an optional YAML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID", global = true)]
    run_id: Option<String>,

    /// Override the RNG seed used for sampling.
    #[arg(long, value_name = "SEED", global = true)]
    seed: Option<u64>,

    /// Override the number of beliefs sampled for move voting.
    #[arg(long, value_name = "COUNT", global = true)]
    sample_size: Option<usize>,

    /// Override the engine executable (otherwise STOCKFISH_EXECUTABLE is used).
    #[arg(long, value_name = "PATH", global = true)]
    engine: Option<PathBuf>,

    /// Write belief sets and decisions as JSON instead of plain lines.
    #[arg(long, global = true)]
    json: bool,

    /// Exit after validating the configuration.
    #[arg(long)]
    validate_only: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the board of a FEN read from stdin.
    Board,
    /// List pseudo-legal moves, relaxed castles and 0000 for a FEN read from stdin.
    Moves,
    /// Apply a move to a FEN: FEN line, then UCI move line.
    Apply,
    /// List every position one move after a FEN read from stdin.
    NextStates,
    /// List positions after a capture: FEN line, then square line.
    CaptureStates,
    /// Filter FENs by a sensing window: count, FEN lines, then window line.
    Filter,
    /// Choose one move across FENs: count, then FEN lines (or a single FEN line).
    ChooseMove,
    /// Play the configured agent locally: color line, then one opponent move per line.
    Play,
}

impl Command {
    fn utility(&self) -> Utility {
        match self {
            Command::Board => Utility::Board,
            Command::Moves => Utility::Moves,
            Command::Apply => Utility::Apply,
            Command::NextStates => Utility::NextStates,
            Command::CaptureStates => Utility::CaptureStates,
            Command::Filter => Utility::Filter,
            Command::ChooseMove => Utility::ChooseMove,
            Command::Play => Utility::Play,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match cli.config.as_ref() {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    config.agent = config.agent.clone().with_env();

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(seed) = cli.seed {
        config.agent.seed = Some(seed);
    }

    if let Some(sample_size) = cli.sample_size {
        config.agent.sample_size = sample_size;
    }

    if let Some(engine) = cli.engine {
        config.engine.path = Some(engine);
    }

    config.validate()?;

    if cli.validate_only {
        println!(
            "Configuration '{}' is valid (agent {}, sample size {})",
            config.run_id,
            config.agent.kind.as_str(),
            config.agent.sample_size
        );
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no command given; run with --help for the list");
    };

    let log_dir = config.resolved_log_dir();
    let _logging_guard = init_logging(&config.logging, &log_dir)?;
    event!(
        target: "rbc_cli",
        Level::INFO,
        version = env!("CARGO_PKG_VERSION"),
        run_id = %config.run_id,
        "starting"
    );

    let stdin = io::stdin();
    let mut stdout = BufWriter::new(io::stdout().lock());
    run_utility(
        command.utility(),
        &config,
        cli.json,
        stdin.lock(),
        &mut stdout,
    )
}
