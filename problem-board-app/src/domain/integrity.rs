use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of comparing installed files against the stored baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    TamperedCountMismatch { expected: usize, actual: usize },
    TamperedFileChanged { path: PathBuf },
}
