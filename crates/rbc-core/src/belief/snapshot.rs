use super::BeliefSet;
use crate::model::{ParseError, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeliefSnapshot {
    pub size: usize,
    pub positions: Vec<String>,
}

impl BeliefSnapshot {
    pub fn capture(beliefs: &BeliefSet) -> Self {
        BeliefSnapshot {
            size: beliefs.len(),
            positions: beliefs.fens(),
        }
    }

    pub fn restore(&self) -> Result<BeliefSet, ParseError> {
        self.positions
            .iter()
            .map(|fen| Position::from_fen(fen))
            .collect()
    }

    pub fn to_json(beliefs: &BeliefSet) -> serde_json::Result<String> {
        let snapshot = Self::capture(beliefs);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::BeliefSnapshot;
    use crate::belief::BeliefSet;
    use crate::model::{Position, STARTING_FEN};

    #[test]
    fn snapshot_serializes_sorted_fens() {
        let beliefs: BeliefSet = [Position::starting(), Position::starting().pass()]
            .into_iter()
            .collect();
        let json = BeliefSnapshot::to_json(&beliefs).unwrap();
        assert!(json.contains("\"size\": 2"));
        let snapshot = BeliefSnapshot::from_json(&json).unwrap();
        let mut sorted = snapshot.positions.clone();
        sorted.sort();
        assert_eq!(snapshot.positions, sorted);
    }

    #[test]
    fn snapshot_roundtrip_restores_members() {
        let beliefs = BeliefSet::singleton(Position::starting());
        let restored = BeliefSnapshot::capture(&beliefs).restore().unwrap();
        assert_eq!(restored, beliefs);
    }

    #[test]
    fn restore_rejects_corrupt_positions() {
        let snapshot = BeliefSnapshot {
            size: 2,
            positions: vec![STARTING_FEN.to_string(), "not a fen".to_string()],
        };
        assert!(snapshot.restore().is_err());
    }
}
