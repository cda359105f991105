pub mod agent;
pub mod engine;
pub mod select;

pub use agent::{
    Agent, AgentConfig, AgentKind, AgentParams, BeliefAgent, RandomAgent, SingleBoardAgent,
    build_agent,
};
pub use engine::{EngineError, EngineOptions, Evaluator, SearchLimit, UciEngine, Unavailable};
pub use select::{MoveDecision, MoveReason, MoveSelector, MoveTally, SenseReason, SenseSelector};
