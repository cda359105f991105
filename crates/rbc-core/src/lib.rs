//! Chess model, rules oracle and belief machinery for Reconnaissance Blind Chess.
//!
//! Everything here is deterministic given a seeded RNG; engines and agents live in
//! `rbc-bot`.

pub mod belief;
pub mod model;
pub mod rules;
