use crate::domain::Verdict;
use crate::infrastructure::integrity::{BaselineManager, FileHasher, FileHashes};
use problem_board_errors::AppError;
use std::path::PathBuf;

/// Compares the installed files under `root` against a stored baseline.
///
/// A missing baseline is the first-run case: one is generated and the check
/// passes. Nothing ever removes a baseline.
pub struct IntegrityChecker {
    root: PathBuf,
    baseline_manager: BaselineManager,
}

impl IntegrityChecker {
    pub fn new(root: impl Into<PathBuf>, baseline_file: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            baseline_manager: BaselineManager::new(baseline_file),
        }
    }

    pub fn generate_baseline(&self) -> Result<FileHashes, AppError> {
        let baseline = self.hash_installed()?;
        self.baseline_manager.save_baseline(&baseline)?;
        tracing::info!(files = baseline.len(), "Baseline generated successfully");
        Ok(baseline)
    }

    pub fn verify_integrity(&self) -> Result<Verdict, AppError> {
        let baseline = self.baseline_manager.read_baseline()?;
        if baseline.is_empty() {
            tracing::info!("No baseline found. Generating a new one");
            self.generate_baseline()?;
            return Ok(Verdict::Passed);
        }

        let current = self.hash_installed()?;
        if current.len() != baseline.len() {
            tracing::error!(
                expected = baseline.len(),
                actual = current.len(),
                "Tampering detected: number of files has changed"
            );
            return Ok(Verdict::TamperedCountMismatch {
                expected: baseline.len(),
                actual: current.len(),
            });
        }

        for (path, hash) in &baseline {
            if current.get(path) != Some(hash) {
                tracing::error!(path = %path.display(), "Tampering detected: file has been modified");
                return Ok(Verdict::TamperedFileChanged { path: path.clone() });
            }
        }

        tracing::info!("Integrity check passed");
        Ok(Verdict::Passed)
    }

    fn hash_installed(&self) -> Result<FileHashes, AppError> {
        let hashes = FileHasher::hash_tree(&self.root, Some(self.baseline_manager.path()))?;
        Ok(hashes)
    }
}
