mod baseline_manager;
mod file_hasher;

pub use baseline_manager::BaselineManager;
pub use file_hasher::{FileHasher, FileHashes};

use problem_board_errors::AppError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to write baseline {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("baseline {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<IntegrityError> for AppError {
    fn from(err: IntegrityError) -> Self {
        AppError::Integrity(err.to_string())
    }
}
