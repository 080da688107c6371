//! In-process [`TreeStore`] with the hosted store's semantics.
//!
//! Every mutation publishes the new tree on a broadcast channel while the
//! write lock is still held, so subscribers observe changes in the order
//! they were applied. Subscribers compare their subtree against the last
//! value they delivered and stay silent when nothing under their path
//! actually changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cinedex_common::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::push_id::PushIdGenerator;
use crate::tree::{Snapshot, Subscription, TreeStore};
use crate::tree_path;

/// Broadcast buffer; slower subscribers skip ahead to the newest tree.
const CHANGE_CAPACITY: usize = 256;

/// Per-subscription delivery buffer.
const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Debug, Clone)]
struct Change {
    path: Vec<String>,
    root: Arc<Value>,
}

/// Tree store held entirely in memory.
pub struct MemoryStore {
    root: RwLock<Value>,
    changes: broadcast::Sender<Change>,
    keys: Mutex<PushIdGenerator>,
    offline: AtomicBool,
    deny_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(Value::Null)
    }

    /// Start from an existing tree.
    pub fn with_data(data: Value) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            root: RwLock::new(tree_path::normalize(data)),
            changes,
            keys: Mutex::new(PushIdGenerator::new()),
            offline: AtomicBool::new(false),
            deny_writes: AtomicBool::new(false),
        }
    }

    /// Copy of the whole tree.
    pub fn dump(&self) -> Value {
        self.root.read().clone()
    }

    /// Make every request fail as if the network were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject writes as the hosted store does when rules deny access.
    pub fn set_deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    /// Number of live subscription tasks.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::network("store is unreachable"));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check_online()?;
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(Error::backend(401, "Permission denied"));
        }
        Ok(())
    }

    fn mutate(&self, segs: Vec<String>, apply: impl FnOnce(&mut Value) -> Result<()>) -> Result<()> {
        let mut root = self.root.write();
        apply(&mut *root)?;
        let change = Change {
            path: segs,
            root: Arc::new(root.clone()),
        };
        // No receivers is fine.
        let _ = self.changes.send(change);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    fn generate_key(&self) -> String {
        self.keys.lock().generate()
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let segs = tree_path::segments(path)?;
        self.check_writable()?;
        tracing::trace!(path, "memory write");
        let target = segs.clone();
        self.mutate(segs, move |root| {
            tree_path::set(root, &target, value);
            Ok(())
        })
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let segs = tree_path::segments(path)?;
        self.check_writable()?;
        tracing::trace!(path, fields = fields.len(), "memory patch");
        let target = segs.clone();
        self.mutate(segs, move |root| tree_path::merge(root, &target, fields))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let segs = tree_path::segments(path)?;
        self.check_writable()?;
        tracing::trace!(path, "memory remove");
        let target = segs.clone();
        self.mutate(segs, move |root| {
            tree_path::set(root, &target, Value::Null);
            Ok(())
        })
    }

    async fn read_once(&self, path: &str) -> Result<Snapshot> {
        let segs = tree_path::segments(path)?;
        self.check_online()?;
        let root = self.root.read();
        Ok(tree_path::get(&root, &segs).cloned())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let segs = tree_path::segments(path)?;
        self.check_online()?;

        // Take the initial value and join the channel under one lock so no
        // change can slip in between.
        let (initial, mut changes) = {
            let root = self.root.read();
            (
                tree_path::get(&root, &segs).cloned(),
                self.changes.subscribe(),
            )
        };

        let (sub, tx, token) = Subscription::channel(path, SUBSCRIPTION_BUFFER);
        let path = path.to_string();

        tokio::spawn(async move {
            let mut last = initial.clone();
            tokio::select! {
                _ = token.cancelled() => return,
                res = tx.send(Ok(initial)) => if res.is_err() { return },
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = changes.recv() => match msg {
                        Ok(change) => {
                            if !tree_path::overlaps(&change.path, &segs) {
                                continue;
                            }
                            let current = tree_path::get(&change.root, &segs).cloned();
                            if current == last {
                                continue;
                            }
                            last = current.clone();
                            // A full buffer must not outlive cancellation.
                            tokio::select! {
                                _ = token.cancelled() => break,
                                res = tx.send(Ok(current)) => if res.is_err() { break },
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(%path, skipped, "Subscriber lagged; skipping to newer changes");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!(%path, "Memory subscription stopped");
        });

        Ok(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::time::Duration;

    async fn next_value(sub: &mut Subscription) -> Snapshot {
        tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .expect("timed out waiting for delivery")
            .expect("subscription ended")
            .expect("subscription errored")
    }

    async fn assert_quiet(sub: &mut Subscription) {
        let res = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(res.is_err(), "unexpected delivery: {res:?}");
    }

    #[tokio::test]
    async fn write_read_remove() {
        let store = MemoryStore::new();
        store.write("movies/m1", json!({ "MovieName": "Alpha" })).await.unwrap();
        assert_eq!(
            store.read_once("movies/m1").await.unwrap(),
            Some(json!({ "MovieName": "Alpha" }))
        );

        store.remove("movies/m1").await.unwrap();
        assert_eq!(store.read_once("movies/m1").await.unwrap(), None);
        assert_eq!(store.dump(), Value::Null);
    }

    #[tokio::test]
    async fn remove_missing_is_ok() {
        let store = MemoryStore::new();
        store.remove("movies/ghost").await.unwrap();
    }

    #[tokio::test]
    async fn patch_creates_partial_record() {
        let store = MemoryStore::new();
        let mut fields = Map::new();
        fields.insert("Rating".into(), json!(8.0));
        store.patch("movies/new", fields).await.unwrap();
        assert_eq!(
            store.read_once("movies/new").await.unwrap(),
            Some(json!({ "Rating": 8.0 }))
        );
    }

    #[tokio::test]
    async fn subscription_delivers_initial_and_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("movies").await.unwrap();
        assert_eq!(next_value(&mut sub).await, None);

        store.write("movies/a", json!(1)).await.unwrap();
        assert_eq!(next_value(&mut sub).await, Some(json!({ "a": 1 })));

        store.write("movies/b", json!(2)).await.unwrap();
        assert_eq!(next_value(&mut sub).await, Some(json!({ "a": 1, "b": 2 })));
    }

    #[tokio::test]
    async fn unrelated_and_no_op_changes_are_silent() {
        let store = MemoryStore::new();
        store.write("movies/a", json!(1)).await.unwrap();
        let mut sub = store.subscribe("movies").await.unwrap();
        next_value(&mut sub).await;

        store.write("users/u1", json!({ "email": "a@b.c" })).await.unwrap();
        store.write("movies/a", json!(1)).await.unwrap();
        store.remove("movies/ghost").await.unwrap();
        assert_quiet(&mut sub).await;
    }

    #[tokio::test]
    async fn offline_and_denied_errors() {
        let store = MemoryStore::new();
        store.set_deny_writes(true);
        let err = store.write("movies/a", json!(1)).await.unwrap_err();
        assert_matches!(err, Error::Backend { status: 401, .. });
        // Reads still work while writes are denied.
        assert_eq!(store.read_once("movies").await.unwrap(), None);

        store.set_offline(true);
        assert_matches!(store.read_once("movies").await, Err(Error::Network(_)));
        assert_matches!(store.subscribe("movies").await, Err(Error::Network(_)));
    }

    #[tokio::test]
    async fn invalid_path_is_validation_error() {
        let store = MemoryStore::new();
        let err = store.write("movies/a.b", json!(1)).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn generated_keys_are_unique() {
        let store = MemoryStore::new();
        let a = store.generate_key();
        let b = store.generate_key();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[tokio::test]
    async fn cancel_stops_task_blocked_on_full_buffer() {
        let store = MemoryStore::new();
        let sub = store.subscribe("movies").await.unwrap();
        assert_eq!(store.subscriber_count(), 1);

        // Nobody reads, so the delivery buffer fills and the task blocks.
        for i in 0..(SUBSCRIPTION_BUFFER as i64 + 8) {
            store.write("movies/a", json!(i)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.subscriber_count(), 1);

        sub.cancel();
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.subscriber_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscription task kept running after cancel");
        drop(sub);
    }
}
