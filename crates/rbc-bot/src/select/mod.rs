//! Sense and move selection over a belief set.

mod moves;
mod sense;
mod tally;

pub use moves::{DEFAULT_SAMPLE_SIZE, MoveDecision, MoveReason, MoveSelector, king_capture};
pub use sense::{SenseContext, SenseReason, SenseSelector};
pub use tally::MoveTally;
