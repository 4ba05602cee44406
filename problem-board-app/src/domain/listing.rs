use super::ProblemWithId;
use serde::{Deserialize, Serialize};

/// What a problem list view shows.
///
/// `LoginRequired` is distinct from an empty list so callers can tell
/// "no data" apart from "no permission".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProblemListing {
    LoginRequired,
    Problems { problems: Vec<ProblemWithId> },
}

impl ProblemListing {
    pub fn problems(&self) -> &[ProblemWithId] {
        match self {
            Self::LoginRequired => &[],
            Self::Problems { problems } => problems,
        }
    }
}
