use crate::model::{Color, Position, SensingWindow};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::collections::hash_set;

/// Deduplicated set of positions the hidden board might currently be in.
///
/// Iteration order of the underlying hash set is unspecified, so anything that has to be
/// reproducible (output, seeded sampling) goes through [`BeliefSet::sorted`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeliefSet {
    positions: HashSet<Position>,
}

impl BeliefSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(position: Position) -> Self {
        let mut positions = HashSet::with_capacity(1);
        positions.insert(position);
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.positions.contains(position)
    }

    /// Adds a position, returning `false` if an equal one was already present.
    pub fn insert(&mut self, position: Position) -> bool {
        self.positions.insert(position)
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Position> {
        self.positions.iter()
    }

    /// Members in canonical FEN order.
    pub fn sorted(&self) -> Vec<&Position> {
        let mut members: Vec<&Position> = self.positions.iter().collect();
        members.sort_by_cached_key(|position| position.to_fen());
        members
    }

    pub fn fens(&self) -> Vec<String> {
        let mut fens: Vec<String> = self.positions.iter().map(Position::to_fen).collect();
        fens.sort();
        fens
    }

    /// Up to `count` distinct members chosen uniformly; deterministic for a seeded `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Position> {
        let sorted = self.sorted();
        sorted
            .choose_multiple(rng, count)
            .map(|position| (*position).clone())
            .collect()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Position> {
        self.sorted().choose(rng).copied()
    }

    /// Keeps at most `max` members. Returns the (possibly reduced) set and whether
    /// anything was dropped.
    pub fn capped<R: Rng + ?Sized>(self, max: usize, rng: &mut R) -> (BeliefSet, bool) {
        if self.len() <= max {
            return (self, false);
        }
        let kept = self.sample(max, rng).into_iter().collect();
        (kept, true)
    }

    /// Members consistent with every square of `window`; never grows the set.
    pub fn retain_consistent(&self, window: &SensingWindow) -> BeliefSet {
        self.positions
            .iter()
            .filter(|position| window.is_consistent_with(position))
            .cloned()
            .collect()
    }

    /// Splits into (members with `color` to move, all other members).
    pub fn partition_by_turn(&self, color: Color) -> (BeliefSet, BeliefSet) {
        let (matching, rest): (HashSet<Position>, HashSet<Position>) = self
            .positions
            .iter()
            .cloned()
            .partition(|position| position.turn() == color);
        (Self { positions: matching }, Self { positions: rest })
    }

    pub fn union(mut self, other: BeliefSet) -> BeliefSet {
        self.positions.extend(other.positions);
        self
    }
}

impl FromIterator<Position> for BeliefSet {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl Extend<Position> for BeliefSet {
    fn extend<I: IntoIterator<Item = Position>>(&mut self, iter: I) {
        self.positions.extend(iter);
    }
}

impl IntoIterator for BeliefSet {
    type Item = Position;
    type IntoIter = hash_set::IntoIter<Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_iter()
    }
}

impl<'a> IntoIterator for &'a BeliefSet {
    type Item = &'a Position;
    type IntoIter = hash_set::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn beliefs(fens: &[&str]) -> BeliefSet {
        fens.iter().map(|fen| Position::from_fen(fen).unwrap()).collect()
    }

    const FENS: [&str; 4] = [
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    ];

    #[test]
    fn duplicates_collapse() {
        let mut set = beliefs(&FENS);
        assert_eq!(set.len(), 4);
        assert!(!set.insert(Position::starting()));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn sorted_order_is_by_fen() {
        let set = beliefs(&FENS);
        let fens = set.fens();
        let mut expected: Vec<String> = FENS.iter().map(|f| f.to_string()).collect();
        expected.sort();
        assert_eq!(fens, expected);
        let sorted: Vec<String> = set.sorted().iter().map(|p| p.to_fen()).collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let set = beliefs(&FENS);
        let first = set.sample(2, &mut SmallRng::seed_from_u64(7));
        let second = set.sample(2, &mut SmallRng::seed_from_u64(7));
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|p| set.contains(p)));
        assert_eq!(set.sample(10, &mut SmallRng::seed_from_u64(7)).len(), 4);
    }

    #[test]
    fn capping_reports_truncation() {
        let set = beliefs(&FENS);
        let mut rng = SmallRng::seed_from_u64(1);
        let (same, truncated) = set.clone().capped(4, &mut rng);
        assert!(!truncated);
        assert_eq!(same, set);
        let (smaller, truncated) = set.capped(3, &mut rng);
        assert!(truncated);
        assert_eq!(smaller.len(), 3);
    }

    #[test]
    fn partition_splits_on_side_to_move() {
        let set = beliefs(&FENS);
        let (black, white) = set.partition_by_turn(Color::Black);
        assert_eq!(black.len(), 3);
        assert_eq!(white.len(), 1);
        assert!(white.contains(&Position::starting()));
    }

    #[test]
    fn consistency_filter_never_grows() {
        let set = beliefs(&FENS);
        let window: SensingWindow = "e4:P".parse().unwrap();
        let kept = set.retain_consistent(&window);
        assert_eq!(kept.len(), 1);
        assert!(kept.iter().all(|p| set.contains(p)));
    }
}
