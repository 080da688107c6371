//! The tree-structured real-time store, as seen by this crate.
//!
//! Values are JSON trees addressed by slash-separated paths. Writing `null`
//! deletes; empty objects do not exist. Subscriptions deliver the full
//! value at their path once on start and again after every net change.

use async_trait::async_trait;
use cinedex_common::Result;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Value at a path; `None` when nothing is stored there.
pub type Snapshot = Option<Value>;

/// Operations offered by a real-time tree store.
///
/// Implementations are shared behind an `Arc` and must be safe to call
/// from many tasks at once. No ordering is promised between concurrent
/// writes to the same path; the last one to reach the store wins.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Produce a new unique child key. Does not touch the network.
    fn generate_key(&self) -> String;

    /// Replace the value at `path`.
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Replace only the named children of the value at `path`.
    ///
    /// Like the hosted store, this creates a partial record when nothing
    /// exists at `path` yet.
    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Delete the value at `path`. Deleting nothing succeeds.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Read the value at `path` once.
    async fn read_once(&self, path: &str) -> Result<Snapshot>;

    /// Start a standing listener on `path`.
    async fn subscribe(&self, path: &str) -> Result<Subscription>;
}

/// Standing listener on a path.
///
/// The listener runs on a background task until [`cancel`](Self::cancel)
/// is called or the handle is dropped. An error item is terminal: the
/// stream ends after delivering it.
#[derive(Debug)]
pub struct Subscription {
    path: String,
    rx: mpsc::Receiver<Result<Snapshot>>,
    token: CancellationToken,
}

impl Subscription {
    /// Create the handle together with the sender and token the feeding
    /// task should use.
    pub fn channel(
        path: impl Into<String>,
        buffer: usize,
    ) -> (Self, mpsc::Sender<Result<Snapshot>>, CancellationToken) {
        let (tx, rx) = mpsc::channel(buffer);
        let token = CancellationToken::new();
        let sub = Self {
            path: path.into(),
            rx,
            token: token.clone(),
        };
        (sub, tx, token)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the next delivery. `None` once the listener has stopped.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            item = self.rx.recv() => item,
            _ = self.token.cancelled() => None,
        }
    }

    /// Stop the listener. Pending deliveries are discarded.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(path = %self.path, "Cancelling subscription");
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
