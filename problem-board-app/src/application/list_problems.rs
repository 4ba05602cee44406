use crate::domain::{ProblemEntry, ProblemListing, ProblemRef, ProblemWithId, Session, UserKey};
use crate::infrastructure::store::{
    owner_path, problem_path, Subscription, TreeStore, USER_PROBLEMS,
};
use problem_board_errors::AppError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the "my problems" and "all problems" views.
pub struct ListProblems {
    store: Arc<dyn TreeStore>,
}

impl ListProblems {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Problems filed by the signed-in user.
    pub async fn personal(&self, session: &Session) -> Result<ProblemListing, AppError> {
        let Some(owner) = session.user() else {
            return Ok(ProblemListing::LoginRequired);
        };
        let snapshot = self.store.get(&owner_path(owner)).await?;
        Ok(ProblemListing::Problems {
            problems: collect_owned(owner, snapshot.as_ref()),
        })
    }

    /// Problems from every owner, each tagged with its owner key.
    pub async fn universal(&self) -> Result<Vec<ProblemWithId>, AppError> {
        let snapshot = self.store.get(USER_PROBLEMS).await?;
        Ok(collect_all(snapshot.as_ref()))
    }

    /// One problem for the detail screen; `None` when absent or unreadable.
    pub async fn problem(&self, target: &ProblemRef) -> Result<Option<ProblemWithId>, AppError> {
        let snapshot = self.store.get(&problem_path(target)).await?;
        Ok(snapshot.and_then(|value| parse_one(target, value)))
    }

    pub fn watch_personal(&self, session: &Session) -> ProblemFeed {
        match session.user() {
            Some(owner) => ProblemFeed {
                source: FeedSource::Owned {
                    owner: owner.clone(),
                    subscription: self.store.subscribe(&owner_path(owner)),
                },
            },
            None => ProblemFeed {
                source: FeedSource::LoginRequired { delivered: false },
            },
        }
    }

    pub fn watch_universal(&self) -> ProblemFeed {
        ProblemFeed {
            source: FeedSource::All {
                subscription: self.store.subscribe(USER_PROBLEMS),
            },
        }
    }

    pub fn watch_problem(&self, target: &ProblemRef) -> ProblemWatch {
        ProblemWatch {
            target: target.clone(),
            subscription: self.store.subscribe(&problem_path(target)),
        }
    }
}

enum FeedSource {
    LoginRequired { delivered: bool },
    Owned { owner: UserKey, subscription: Subscription },
    All { subscription: Subscription },
}

/// A live problem list. Every item replaces the previous one entirely.
///
/// Dropping the feed unsubscribes from the store.
pub struct ProblemFeed {
    source: FeedSource,
}

impl ProblemFeed {
    pub async fn next(&mut self) -> Option<Result<ProblemListing, AppError>> {
        match &mut self.source {
            FeedSource::LoginRequired { delivered } => {
                if *delivered {
                    return None;
                }
                *delivered = true;
                Some(Ok(ProblemListing::LoginRequired))
            }
            FeedSource::Owned {
                owner,
                subscription,
            } => {
                let snapshot = subscription.next().await?;
                Some(
                    snapshot
                        .map(|value| ProblemListing::Problems {
                            problems: collect_owned(owner, value.as_ref()),
                        })
                        .map_err(|e| {
                            tracing::error!("Failed to load problems: {}", e);
                            AppError::from(e)
                        }),
                )
            }
            FeedSource::All { subscription } => {
                let snapshot = subscription.next().await?;
                Some(
                    snapshot
                        .map(|value| ProblemListing::Problems {
                            problems: collect_all(value.as_ref()),
                        })
                        .map_err(|e| {
                            tracing::error!("Failed to load problems: {}", e);
                            AppError::from(e)
                        }),
                )
            }
        }
    }

    pub fn cancel(self) {}
}

/// Live view of a single problem.
pub struct ProblemWatch {
    target: ProblemRef,
    subscription: Subscription,
}

impl ProblemWatch {
    pub async fn next(&mut self) -> Option<Result<Option<ProblemWithId>, AppError>> {
        let snapshot = self.subscription.next().await?;
        Some(
            snapshot
                .map(|value| value.and_then(|v| parse_one(&self.target, v)))
                .map_err(AppError::from),
        )
    }

    pub fn cancel(self) {}
}

/// Entries of one owner's collection (`id -> entry`).
pub fn collect_owned(owner: &UserKey, snapshot: Option<&Value>) -> Vec<ProblemWithId> {
    let mut problems = Vec::new();
    if let Some(node) = snapshot {
        push_entries(owner, node, &mut problems);
    }
    finalize(problems)
}

/// Entries of every owner (`owner -> id -> entry`).
pub fn collect_all(snapshot: Option<&Value>) -> Vec<ProblemWithId> {
    let mut problems = Vec::new();
    let Some(owners) = snapshot.and_then(Value::as_object) else {
        return problems;
    };
    for (owner, node) in owners {
        push_entries(&UserKey::from_sanitized(owner.as_str()), node, &mut problems);
    }
    finalize(problems)
}

fn push_entries(owner: &UserKey, node: &Value, out: &mut Vec<ProblemWithId>) {
    let Some(entries) = node.as_object() else {
        tracing::debug!(owner = %owner, "Skipping non-object problem collection");
        return;
    };
    for (id, value) in entries {
        if let Some(problem) = parse_one(&ProblemRef::new(owner.clone(), id.as_str()), value.clone()) {
            out.push(problem);
        }
    }
}

fn parse_one(target: &ProblemRef, value: Value) -> Option<ProblemWithId> {
    let entry: ProblemEntry = match serde_json::from_value(value) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::debug!(id = %target.id, "Skipping malformed problem: {}", e);
            return None;
        }
    };
    if !entry.is_displayable() {
        tracing::debug!(id = %target.id, "Skipping incomplete problem");
        return None;
    }
    Some(ProblemWithId {
        id: target.id.clone(),
        owner: target.owner.clone(),
        entry,
    })
}

/// Deduplicates by id (last occurrence wins) and sorts newest first.
fn finalize(problems: Vec<ProblemWithId>) -> Vec<ProblemWithId> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(problems.len());
    let mut unique: Vec<ProblemWithId> = Vec::with_capacity(problems.len());
    for problem in problems {
        match index.get(&problem.id) {
            Some(&slot) => unique[slot] = problem,
            None => {
                index.insert(problem.id.clone(), unique.len());
                unique.push(problem);
            }
        }
    }
    unique.sort_by(|a, b| {
        b.entry
            .timestamp
            .cmp(&a.entry.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    unique
}
