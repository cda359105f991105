use rbc_bot::{AgentConfig, AgentParams, EngineOptions};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_RUN_ID: &str = "rbc";
const DEFAULT_LOG_DIR: &str = "logs/{run_id}";
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root configuration loaded from YAML. Every section is optional.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub run_id: String,
    pub agent: AgentParams,
    pub engine: EngineOptions,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_id: DEFAULT_RUN_ID.to_string(),
            agent: AgentParams::default(),
            engine: EngineOptions::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: Config =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        validate_agent(&self.agent)?;
        validate_engine(&self.engine)?;
        self.logging.normalize();
        Ok(())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            agent: self.agent.clone(),
            engine: self.engine.clone(),
        }
    }

    /// Directory for structured logs with `{run_id}` substituted.
    pub fn resolved_log_dir(&self) -> PathBuf {
        resolve_template(&self.run_id, &self.logging.log_dir)
    }
}

/// Logging configuration defaults to plain stderr output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            log_dir: default_log_dir(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.log_dir.trim().is_empty() {
            self.log_dir = default_log_dir();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "warn".to_string()
}

fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_agent(agent: &AgentParams) -> Result<(), ValidationError> {
    if agent.sample_size == 0 {
        return Err(ValidationError::InvalidField {
            field: "agent.sample_size".to_string(),
            message: "sample size must be at least 1".to_string(),
        });
    }

    if agent.max_beliefs == Some(0) {
        return Err(ValidationError::InvalidField {
            field: "agent.max_beliefs".to_string(),
            message: "belief cap must be greater than zero (omit it to disable the cap)"
                .to_string(),
        });
    }

    if agent.recovery_width == 0 {
        return Err(ValidationError::InvalidField {
            field: "agent.recovery_width".to_string(),
            message: "recovery width must be at least 1".to_string(),
        });
    }

    if !(agent.time_fraction > 0.0 && agent.time_fraction <= 1.0) {
        return Err(ValidationError::InvalidField {
            field: "agent.time_fraction".to_string(),
            message: "time fraction must lie in (0, 1]".to_string(),
        });
    }

    Ok(())
}

fn validate_engine(engine: &EngineOptions) -> Result<(), ValidationError> {
    if engine.move_time_ms == 0 {
        return Err(ValidationError::InvalidField {
            field: "engine.move_time_ms".to_string(),
            message: "move time must be greater than zero".to_string(),
        });
    }

    if engine.min_move_time_ms > engine.move_time_ms {
        return Err(ValidationError::InvalidField {
            field: "engine.min_move_time_ms".to_string(),
            message: format!(
                "minimum move time {} exceeds move time {}",
                engine.min_move_time_ms, engine.move_time_ms
            ),
        });
    }

    if engine.nodes == Some(0) {
        return Err(ValidationError::InvalidField {
            field: "engine.nodes".to_string(),
            message: "node budget must be greater than zero".to_string(),
        });
    }

    if engine
        .path
        .as_ref()
        .is_some_and(|path| path.as_os_str().is_empty())
    {
        return Err(ValidationError::InvalidField {
            field: "engine.path".to_string(),
            message: "path must not be empty".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbc_bot::AgentKind;

    const BASIC_YAML: &str = r#"
run_id: "lab_01"
agent:
  kind: "belief"
  seed: 7
  sample_size: 8
  max_beliefs: 2000
engine:
  path: "/opt/stockfish/stockfish"
  move_time_ms: 300
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: Config = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.agent.kind, AgentKind::Belief);
        assert_eq!(cfg.agent.sample_size, 8);
        assert_eq!(cfg.agent.max_beliefs, Some(2000));
        assert_eq!(cfg.agent.recovery_width, 10);
        assert_eq!(cfg.engine.move_time_ms, 300);
        assert_eq!(cfg.engine.min_move_time_ms, 50);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));
        assert_eq!(cfg.resolved_log_dir(), PathBuf::from("logs/lab_01"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let mut cfg: Config = serde_yaml::from_str("{}").expect("parse");
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg, Config::default());
        assert!(!cfg.logging.enable_structured);
    }

    #[test]
    fn rejects_zero_sample_size() {
        let yaml = BASIC_YAML.replace("sample_size: 8", "sample_size: 0");
        let mut cfg: Config = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero sample size");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agent.sample_size"
        ));
    }

    #[test]
    fn rejects_inverted_move_times() {
        let yaml = BASIC_YAML.replace("move_time_ms: 300", "move_time_ms: 300\n  min_move_time_ms: 900");
        let mut cfg: Config = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("inverted budget");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "engine.min_move_time_ms"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("lab_01", "lab 01");
        let mut cfg: Config = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn unknown_agent_kind_fails_to_parse() {
        let yaml = BASIC_YAML.replace("kind: \"belief\"", "kind: \"oracle\"");
        assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = Config::from_path("/nonexistent/rbc.yaml").expect_err("missing file");
        assert_eq!(err.path(), Path::new("/nonexistent/rbc.yaml"));
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
