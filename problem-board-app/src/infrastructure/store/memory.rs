use super::{
    split_path, StoreError, Subscription, TreeStore, TxOutcome, TxUpdate, DEFAULT_MAX_RETRIES,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// In-process JSON tree with the same contract as the hosted store.
///
/// Transactions are compare-and-swap on the value at the path: the update
/// runs without the lock held, and the write only lands if the value is
/// still the one the update saw. Nulls and empty objects are never stored.
#[derive(Clone)]
pub struct MemoryTree {
    inner: Arc<Inner>,
}

struct Inner {
    root: RwLock<Value>,
    revision: watch::Sender<u64>,
    max_retries: u32,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::with_max_retries(DEFAULT_MAX_RETRIES)
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                root: RwLock::new(Value::Null),
                revision,
                max_retries: max_retries.max(1),
            }),
        }
    }

    pub fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let root = self.inner.root.read().unwrap_or_else(PoisonError::into_inner);
        Ok(lookup(&root, &segments).cloned())
    }

    pub fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        {
            let mut root = self.inner.root.write().unwrap_or_else(PoisonError::into_inner);
            put(&mut root, &segments, normalize(value));
        }
        self.bump();
        Ok(())
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeStore for MemoryTree {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.read(path)
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.write(path, value)
    }

    async fn transact(&self, path: &str, update: TxUpdate<'_>) -> Result<TxOutcome, StoreError> {
        let segments = split_path(path)?;
        for attempt in 1..=self.inner.max_retries {
            let seen = self.read(path)?;
            let Some(next) = update(seen.as_ref()) else {
                return Ok(TxOutcome::Aborted(seen));
            };
            let next = normalize(next);

            let committed = {
                let mut root = self.inner.root.write().unwrap_or_else(PoisonError::into_inner);
                if lookup(&root, &segments) == seen.as_ref() {
                    put(&mut root, &segments, next.clone());
                    true
                } else {
                    false
                }
            };
            if committed {
                self.bump();
                return Ok(TxOutcome::Committed(next));
            }

            tracing::debug!(path, attempt, "transaction conflict, retrying");
            tokio::task::yield_now().await;
        }

        Err(StoreError::Conflict {
            path: path.to_string(),
            attempts: self.inner.max_retries,
        })
    }

    fn subscribe(&self, path: &str) -> Subscription {
        let tree = self.clone();
        let path = path.to_string();
        let mut changes = self.inner.revision.subscribe();

        Subscription::spawn(move |tx| async move {
            let mut last: Option<Option<Value>> = None;
            loop {
                match tree.read(&path) {
                    Ok(current) => {
                        if last.as_ref() != Some(&current) {
                            if tx.send(Ok(current.clone())).await.is_err() {
                                return;
                            }
                            last = Some(current);
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                }
                if changes.changed().await.is_err() {
                    return;
                }
            }
        })
    }
}

fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(*segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

fn put(root: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = &mut *root;
    for segment in parents {
        if !node.is_object() {
            if value.is_null() {
                return;
            }
            *node = Value::Object(Map::new());
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Some(map) = node.as_object_mut() {
        if value.is_null() {
            map.remove(*last);
        } else {
            map.insert(last.to_string(), value);
        }
    }

    prune(root);
}

/// Drops nulls and empty objects, the way the hosted store does.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn prune(root: &mut Value) {
    let taken = std::mem::take(root);
    *root = normalize(taken);
}
