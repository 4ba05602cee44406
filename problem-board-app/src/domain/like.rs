use serde::{Deserialize, Serialize};

/// Why a like toggle left the record untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Nothing is stored at the target address.
    Missing,
    /// The acting user reported the problem.
    OwnProblem,
    /// The stored record does not parse as a problem entry.
    Malformed,
}

/// Result of a like toggle transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LikeOutcome {
    Committed { liked: bool, like_count: u64 },
    Aborted { reason: AbortReason },
}

impl LikeOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}
