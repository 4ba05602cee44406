use super::{FileHashes, IntegrityError};
use std::fs;
use std::path::{Path, PathBuf};

/// Persists the baseline as a pretty-printed JSON object, one
/// `"path": "hash"` pair per line in path order.
pub struct BaselineManager {
    baseline_file: PathBuf,
}

impl BaselineManager {
    pub fn new(baseline_file: impl Into<PathBuf>) -> Self {
        Self {
            baseline_file: baseline_file.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.baseline_file
    }

    pub fn save_baseline(&self, baseline: &FileHashes) -> Result<(), IntegrityError> {
        let write_err = |source| IntegrityError::Write {
            path: self.baseline_file.clone(),
            source,
        };
        if let Some(parent) = self.baseline_file.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(baseline).map_err(|source| {
            IntegrityError::Corrupt {
                path: self.baseline_file.clone(),
                source,
            }
        })?;
        fs::write(&self.baseline_file, json + "\n").map_err(write_err)
    }

    /// The stored baseline, empty when no baseline file exists yet.
    pub fn read_baseline(&self) -> Result<FileHashes, IntegrityError> {
        let json = match fs::read_to_string(&self.baseline_file) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileHashes::new()),
            Err(source) => {
                return Err(IntegrityError::Read {
                    path: self.baseline_file.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| IntegrityError::Corrupt {
            path: self.baseline_file.clone(),
            source,
        })
    }
}
