use super::StoreError;
use crate::domain::{ProblemRef, UserKey};
use crate::infrastructure::security::KeySanitizer;

/// Root of the per-owner problem collections.
pub const USER_PROBLEMS: &str = "user_problems";

pub fn owner_path(owner: &UserKey) -> String {
    format!("{}/{}", USER_PROBLEMS, owner)
}

pub fn problem_path(problem: &ProblemRef) -> String {
    format!("{}/{}/{}", USER_PROBLEMS, problem.owner, problem.id)
}

/// Splits a path into its segments. The empty path is the root.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if !segments.iter().all(|s| KeySanitizer::is_valid_key(s)) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}
