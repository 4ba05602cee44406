use problem_board_errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user identifier that is safe to use as a path segment in the store.
///
/// Values come either from `KeySanitizer::user_key` (emails typed by a user)
/// or straight from store paths, which are already sanitized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub fn from_sanitized(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The signed-in user, if any, for one caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<UserKey>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: UserKey) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&UserKey> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&UserKey, AppError> {
        self.user.as_ref().ok_or(AppError::LoginRequired)
    }
}
