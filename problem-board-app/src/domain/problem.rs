use super::UserKey;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// `YYYY-MM-DD HH:MM:SS`; lexicographic order of formatted values is
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A reported problem as stored under `user_problems/{owner}/{id}`.
///
/// Every field has a default so partial records still parse. Legacy records
/// used `androidVersion` and `userEmail`; both are accepted on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProblemEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub problem_query: String,
    #[serde(deserialize_with = "null_as_default")]
    pub app_version: String,
    #[serde(alias = "androidVersion", deserialize_with = "null_as_default")]
    pub os_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub device_model: String,
    #[serde(alias = "userEmail", skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<UserKey>,
    #[serde(deserialize_with = "null_as_default")]
    pub like_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub likes: BTreeMap<String, bool>,
}

impl ProblemEntry {
    /// A fresh entry with no likes.
    pub fn new(new_problem: NewProblem, reporter: UserKey, timestamp: String) -> Self {
        Self {
            timestamp,
            problem_query: new_problem.problem_query,
            app_version: new_problem.app_version,
            os_version: new_problem.os_version,
            device_model: new_problem.device_model,
            reporter_id: Some(reporter),
            like_count: 0,
            likes: BTreeMap::new(),
        }
    }

    /// Entries without a timestamp or description are partial writes.
    pub fn is_displayable(&self) -> bool {
        !self.timestamp.trim().is_empty() && !self.problem_query.trim().is_empty()
    }

    pub fn is_reporter(&self, user: &UserKey) -> bool {
        self.reporter_id.as_ref() == Some(user)
    }

    pub fn is_liked_by(&self, user: &UserKey) -> bool {
        self.likes.contains_key(user.as_str())
    }
}

/// Store address of one problem entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemRef {
    pub owner: UserKey,
    pub id: String,
}

impl ProblemRef {
    pub fn new(owner: UserKey, id: impl Into<String>) -> Self {
        Self {
            owner,
            id: id.into(),
        }
    }
}

/// A problem entry together with the address it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemWithId {
    pub id: String,
    pub owner: UserKey,
    #[serde(flatten)]
    pub entry: ProblemEntry,
}

/// What the submission form sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewProblem {
    pub problem_query: String,
    pub app_version: String,
    pub os_version: String,
    pub device_model: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_legacy_field_names() {
        let entry: ProblemEntry = serde_json::from_value(json!({
            "timestamp": "2024-01-01 10:00:00",
            "problemQuery": "crash on open",
            "androidVersion": "Android 14 (API 34)",
            "userEmail": "a_dot_b@c_dot_com",
        }))
        .unwrap();

        assert_eq!(entry.os_version, "Android 14 (API 34)");
        assert_eq!(
            entry.reporter_id,
            Some(UserKey::from_sanitized("a_dot_b@c_dot_com"))
        );
        assert_eq!(entry.like_count, 0);
        assert!(entry.likes.is_empty());
        assert!(entry.app_version.is_empty());
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let entry: ProblemEntry = serde_json::from_value(json!({
            "timestamp": "2024-01-01 10:00:00",
            "problemQuery": "slow",
            "deviceModel": null,
            "likes": null,
        }))
        .unwrap();

        assert!(entry.device_model.is_empty());
        assert!(entry.likes.is_empty());
    }

    #[test]
    fn test_negative_like_count_is_rejected() {
        let parsed = serde_json::from_value::<ProblemEntry>(json!({
            "timestamp": "2024-01-01 10:00:00",
            "problemQuery": "slow",
            "likeCount": -1,
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serializes_with_store_field_names() {
        let entry = ProblemEntry::new(
            NewProblem {
                problem_query: "login fails".to_string(),
                ..Default::default()
            },
            UserKey::from_sanitized("x@y_dot_z"),
            "2024-01-01 10:00:00".to_string(),
        );
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["problemQuery"], "login fails");
        assert_eq!(value["reporterId"], "x@y_dot_z");
        assert_eq!(value["likeCount"], 0);
        assert_eq!(value["likes"], json!({}));
    }

    #[test]
    fn test_blank_query_is_not_displayable() {
        let entry = ProblemEntry {
            timestamp: "2024-01-01 10:00:00".to_string(),
            problem_query: "   ".to_string(),
            ..Default::default()
        };
        assert!(!entry.is_displayable());
    }
}
