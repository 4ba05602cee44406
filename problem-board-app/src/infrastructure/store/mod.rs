//! Client side of the hosted key-value tree.
//!
//! Everything above this module depends only on [`TreeStore`]: point reads,
//! unconditional writes, atomic read-modify-write transactions and snapshot
//! subscriptions. Paths are `/`-separated segments relative to the root.

mod memory;
mod paths;
#[cfg(feature = "rest")]
mod rest;
mod subscription;

pub use memory::MemoryTree;
pub use paths::{owner_path, problem_path, split_path, USER_PROBLEMS};
#[cfg(feature = "rest")]
pub use rest::RestTree;
pub use subscription::Subscription;

use async_trait::async_trait;
use problem_board_errors::AppError;
use serde_json::Value;

/// Retry bound used when a store is built without an explicit one.
pub const DEFAULT_MAX_RETRIES: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("transaction at {path} still conflicting after {attempts} attempts")]
    Conflict { path: String, attempts: u32 },

    #[error("store request failed: {0}")]
    Transport(String),

    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid store path: {0:?}")]
    InvalidPath(String),

    #[error("malformed store response: {0}")]
    Decode(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => AppError::Conflict,
            other => AppError::Store(other.to_string()),
        }
    }
}

/// Result of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// The update's value was written atomically.
    Committed(Value),
    /// The update declined to write; carries the value it last saw.
    Aborted(Option<Value>),
}

/// Update function run inside a transaction.
///
/// It may be invoked several times (once per conflicting attempt) and must
/// derive its result only from the value it is given. `None` aborts.
pub type TxUpdate<'a> = &'a (dyn Fn(Option<&Value>) -> Option<Value> + Send + Sync);

#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Current value at `path`, `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Unconditional write. Writing `null` removes the value.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Atomic read-modify-write at `path`, retried on conflicting writes.
    async fn transact(&self, path: &str, update: TxUpdate<'_>) -> Result<TxOutcome, StoreError>;

    /// Full snapshots of `path`: the current value first, then one per change.
    fn subscribe(&self, path: &str) -> Subscription;
}
