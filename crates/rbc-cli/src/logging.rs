use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Keeps the non-blocking writer flushing until dropped at the end of `main`.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
    pub telemetry_path: Option<PathBuf>,
}

/// Installs the global subscriber: JSON lines under `log_dir` when structured logging is
/// enabled, plain text on stderr otherwise. `RUST_LOG` overrides the configured level.
pub fn init_logging(logging: &LoggingConfig, log_dir: &Path) -> Result<LoggingGuard> {
    let level = logging.level().unwrap_or(Level::WARN);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if !logging.enable_structured {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        // Ignore error if a global subscriber is already set (e.g., when running in tests)
        let _ = tracing::subscriber::set_global_default(subscriber);
        return Ok(LoggingGuard {
            _guard: None,
            telemetry_path: None,
        });
    }

    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating telemetry directory at {}", log_dir.display()))?;

    let telemetry_path = log_dir.join("telemetry.jsonl");
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(LoggingGuard {
        _guard: Some(guard),
        telemetry_path: Some(telemetry_path),
    })
}
