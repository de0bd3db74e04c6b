mod batcher;
mod hand_seg;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use batcher::{HandSegBatch, HandSegBatcher};
pub use hand_seg::{HandSegDataset, HandSegItem, HandSegItemRaw};

/// Camera the depth frame was captured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Head-mounted, looking at the user's own hands.
    Ego,
    /// Facing the user.
    Front,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Ego, Direction::Front];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ego => "ego",
            Direction::Front => "front",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
