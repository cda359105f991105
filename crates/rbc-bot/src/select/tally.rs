use rbc_core::model::Move;
use std::collections::HashMap;

/// Votes per candidate move for one selection round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveTally {
    votes: HashMap<Move, u32>,
}

impl MoveTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vote(&mut self, mv: Move) {
        *self.votes.entry(mv).or_insert(0) += 1;
    }

    pub fn count(&self, mv: Move) -> u32 {
        self.votes.get(&mv).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.votes.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Moves by descending vote count; equal counts in UCI order.
    pub fn ranked(&self) -> Vec<(Move, u32)> {
        let mut ranked: Vec<(Move, u32)> = self.votes.iter().map(|(mv, n)| (*mv, *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.uci().cmp(&b.0.uci())));
        ranked
    }

    pub fn winner(&self) -> Option<(Move, u32)> {
        self.ranked().into_iter().next()
    }
}

impl FromIterator<Move> for MoveTally {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut tally = MoveTally::new();
        for mv in iter {
            tally.vote(mv);
        }
        tally
    }
}
