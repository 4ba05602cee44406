use super::StoreError;
use serde_json::Value;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SNAPSHOT_BUFFER: usize = 16;

/// One item of a subscription: the full value at the watched path.
pub type Snapshot = Result<Option<Value>, StoreError>;

/// A live subscription to a store path.
///
/// The producer runs on its own task. Dropping the handle (or calling
/// [`Subscription::cancel`]) aborts that task, so a subscription never
/// outlives the view that owns it.
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<Snapshot>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let task = tokio::spawn(producer(tx));
        Self { rx, task }
    }

    /// Waits for the next snapshot. `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
