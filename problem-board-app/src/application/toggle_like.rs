use crate::domain::{AbortReason, LikeOutcome, ProblemEntry, ProblemRef, Session, UserKey};
use crate::infrastructure::store::{problem_path, TreeStore, TxOutcome};
use problem_board_errors::AppError;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Likes or unlikes a problem inside a store transaction.
///
/// The branch is taken on the actor's membership in the freshly read
/// `likes` map, never on the caller's `currently_liked` hint, so replays and
/// stale screens cannot skew the counter.
pub struct ToggleLike {
    store: Arc<dyn TreeStore>,
}

impl ToggleLike {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        session: &Session,
        target: &ProblemRef,
        currently_liked: bool,
    ) -> Result<LikeOutcome, AppError> {
        let actor = session.require_user()?;
        let path = problem_path(target);

        let update = |current: Option<&Value>| plan_toggle(current, actor).ok();
        let outcome = self.store.transact(&path, &update).await.map_err(|e| {
            tracing::error!(problem = %target.id, "Failed to toggle like: {}", e);
            AppError::from(e)
        })?;

        match outcome {
            TxOutcome::Committed(value) => {
                let entry: ProblemEntry = serde_json::from_value(value)
                    .map_err(|e| AppError::Internal(format!("committed record: {}", e)))?;
                let liked = entry.is_liked_by(actor);
                if liked == currently_liked {
                    tracing::debug!(
                        problem = %target.id,
                        user = %actor,
                        "Like hint was stale, toggled from stored state"
                    );
                }
                tracing::info!(problem = %target.id, liked, "Like toggled");
                Ok(LikeOutcome::Committed {
                    liked,
                    like_count: entry.like_count,
                })
            }
            TxOutcome::Aborted(seen) => {
                let reason = plan_toggle(seen.as_ref(), actor)
                    .err()
                    .unwrap_or(AbortReason::Malformed);
                tracing::debug!(problem = %target.id, ?reason, "Like toggle aborted");
                Ok(LikeOutcome::Aborted { reason })
            }
        }
    }
}

/// Computes the record to write back, or why nothing should be written.
///
/// Only `likes` and `likeCount` change; other fields, including ones this
/// version does not know about, are carried over untouched.
pub fn plan_toggle(current: Option<&Value>, actor: &UserKey) -> Result<Value, AbortReason> {
    let record = match current {
        None => return Err(AbortReason::Missing),
        Some(Value::Object(record)) => record,
        Some(_) => return Err(AbortReason::Malformed),
    };
    let entry: ProblemEntry = serde_json::from_value(Value::Object(record.clone()))
        .map_err(|_| AbortReason::Malformed)?;

    if entry.is_reporter(actor) {
        tracing::debug!(user = %actor, "Reporter cannot like their own problem");
        return Err(AbortReason::OwnProblem);
    }

    let mut likes = entry.likes;
    if likes.remove(actor.as_str()).is_none() {
        likes.insert(actor.to_string(), true);
    }
    if let Some(reporter) = &entry.reporter_id {
        likes.remove(reporter.as_str());
    }

    let mut next: Map<String, Value> = record.clone();
    next.insert("likeCount".to_string(), json!(likes.len()));
    next.insert("likes".to_string(), json!(likes));
    Ok(Value::Object(next))
}
