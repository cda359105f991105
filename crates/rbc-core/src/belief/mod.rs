//! Belief tracking over the hidden board.
//!
//! This module is composed of:
//! - `set`: the deduplicated set of candidate positions (`BeliefSet`).
//! - `propagate`: expansion across unseen opponent moves and replay of our own moves.
//! - `filter`: pruning against sensing windows, with contradiction recovery.
//! - `snapshot`: JSON capture of a belief set.
//! - `telemetry`: summary metrics for logging.

mod filter;
mod propagate;
mod set;
pub mod snapshot;
pub mod telemetry;

pub use filter::{DEFAULT_RECOVERY_WIDTH, FilterOutcome, SensingFilter, overlay};
pub use propagate::{DEFAULT_MAX_BELIEFS, PropagationLimits, Propagator, ReplayOutcome};
pub use set::BeliefSet;
pub use snapshot::BeliefSnapshot;
pub use telemetry::BeliefMetrics;
