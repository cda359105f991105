use crate::select::DEFAULT_SAMPLE_SIZE;
use rbc_core::belief::{DEFAULT_MAX_BELIEFS, DEFAULT_RECOVERY_WIDTH, PropagationLimits};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    #[default]
    Belief,
    Single,
    Random,
}

impl AgentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AgentKind::Belief => "belief",
            AgentKind::Single => "single",
            AgentKind::Random => "random",
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "belief" | "multi" | "default" => Ok(AgentKind::Belief),
            "single" | "trout" => Ok(AgentKind::Single),
            "random" => Ok(AgentKind::Random),
            other => Err(format!("unknown agent kind '{other}'")),
        }
    }
}

/// Tunables shared by the agent flavors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    pub kind: AgentKind,
    /// Seed for every random choice; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub sample_size: usize,
    pub max_beliefs: Option<usize>,
    pub recovery_width: usize,
    pub avoid_edge_sensing: bool,
    /// Share of the remaining clock one move decision may spend.
    pub time_fraction: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            kind: AgentKind::default(),
            seed: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_beliefs: Some(DEFAULT_MAX_BELIEFS),
            recovery_width: DEFAULT_RECOVERY_WIDTH,
            avoid_edge_sensing: true,
            time_fraction: 0.05,
        }
    }
}

impl AgentParams {
    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_reader<F>(read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self::default().with_overrides(read)
    }

    /// Applies `RBC_*` overrides on top of `self`. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(kind) = read("RBC_AGENT").and_then(|raw| raw.parse().ok()) {
            self.kind = kind;
        }
        if let Some(size) = read("RBC_SAMPLE_SIZE")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
        {
            self.sample_size = size;
        }
        if let Some(raw) = read("RBC_MAX_BELIEFS") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "0" | "none" | "unbounded" => self.max_beliefs = None,
                other => {
                    if let Ok(max) = other.parse::<usize>() {
                        self.max_beliefs = Some(max);
                    }
                }
            }
        }
        if let Some(seed) = read("RBC_SEED").and_then(|raw| raw.trim().parse::<u64>().ok()) {
            self.seed = Some(seed);
        }
        self
    }

    pub fn limits(&self) -> PropagationLimits {
        PropagationLimits {
            max_beliefs: self.max_beliefs,
        }
    }
}
