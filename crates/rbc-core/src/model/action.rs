use super::{Move, Square};
use serde::{Deserialize, Serialize};

/// Report from the game boundary after one of our move attempts.
///
/// `taken` may differ from `requested` when the referee revised the move (a slide cut
/// short by an unseen blocker) or may be `None` when nothing was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub requested: Option<Move>,
    pub taken: Option<Move>,
    pub captured_opponent_piece: bool,
    pub capture_square: Option<Square>,
}

impl MoveResult {
    pub fn executed(mv: Move) -> Self {
        Self {
            requested: Some(mv),
            taken: Some(mv),
            captured_opponent_piece: false,
            capture_square: None,
        }
    }

    pub fn with_capture(mut self, square: Square) -> Self {
        self.captured_opponent_piece = true;
        self.capture_square = Some(square);
        self
    }

    /// True when the referee executed something other than what was asked for.
    pub fn was_revised(&self) -> bool {
        self.requested != self.taken
    }
}
