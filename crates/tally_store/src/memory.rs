//! In-memory remote store.

use crate::error::{StoreError, StoreResult};
use crate::path::NodePath;
use crate::remote::{Committed, RemoteChange, RemoteStore, Snapshot, TransactionOutcome};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

/// An in-memory document store for tests and offline development.
///
/// Behaves like the real backend from the reconciler's point of view:
/// per-path atomic transactions, a monotonically increasing revision for
/// every committed change, and push notifications fanned out to
/// subscribers. Failures can be injected to exercise rollback paths.
#[derive(Default)]
pub struct MemoryRemoteStore {
    /// Documents keyed by full path, with the revision they were
    /// committed at.
    nodes: RwLock<BTreeMap<String, (Value, u64)>>,
    /// Global revision counter.
    revision: AtomicU64,
    /// Subscribers, each watching a subtree.
    subscribers: RwLock<Vec<(NodePath, Sender<RemoteChange>)>>,
    /// Fault consumed by the next transaction.
    fail_next_transact: Mutex<Option<StoreError>>,
    /// Fault consumed by the next write or delete.
    fail_next_write: Mutex<Option<StoreError>>,
    /// Subtrees rejecting all mutations.
    denied: RwLock<Vec<NodePath>>,
}

impl MemoryRemoteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arranges for the next transaction to fail with the given error.
    pub fn set_fail_next_transact(&self, error: StoreError) {
        *self.fail_next_transact.lock() = Some(error);
    }

    /// Arranges for the next write or delete to fail with the given error.
    pub fn set_fail_next_write(&self, error: StoreError) {
        *self.fail_next_write.lock() = Some(error);
    }

    /// Rejects all mutations under the given subtree with
    /// [`StoreError::PermissionDenied`].
    pub fn deny_permission(&self, path: NodePath) {
        self.denied.write().push(path);
    }

    /// Clears all permission denials.
    pub fn allow_all(&self) {
        self.denied.write().clear();
    }

    /// Returns the latest committed revision.
    pub fn current_revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Returns the raw document at a path, for test assertions.
    pub fn document(&self, path: &NodePath) -> Option<Value> {
        self.nodes
            .read()
            .get(path.as_str())
            .map(|(value, _)| value.clone())
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_denied(&self, path: &NodePath) -> StoreResult<()> {
        if self.denied.read().iter().any(|p| p.contains(path)) {
            return Err(StoreError::permission_denied(path.as_str()));
        }
        Ok(())
    }

    fn notify(&self, path: &NodePath, value: Option<Value>, revision: u64) {
        let change = RemoteChange {
            path: path.clone(),
            value,
            revision,
        };
        // Drop disconnected subscribers as a side effect.
        self.subscribers
            .write()
            .retain(|(watched, tx)| !watched.contains(path) || tx.send(change.clone()).is_ok());
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn transact(
        &self,
        path: &NodePath,
        f: &mut dyn FnMut(Option<&Value>) -> TransactionOutcome,
    ) -> StoreResult<Committed> {
        self.check_denied(path)?;
        if let Some(error) = self.fail_next_transact.lock().take() {
            return Err(error);
        }

        let mut nodes = self.nodes.write();
        let current = nodes.get(path.as_str()).map(|(value, _)| value);

        match f(current) {
            TransactionOutcome::Commit(value) => {
                let revision = self.next_revision();
                nodes.insert(path.as_str().to_owned(), (value.clone(), revision));
                drop(nodes);
                self.notify(path, Some(value.clone()), revision);
                Ok(Committed { value, revision })
            }
            TransactionOutcome::AbortMissing => Err(StoreError::not_found(path.as_str())),
            TransactionOutcome::Abort => {
                Err(StoreError::aborted("transaction closure declined to commit"))
            }
        }
    }

    fn read(&self, path: &NodePath) -> StoreResult<Option<Snapshot>> {
        Ok(self
            .nodes
            .read()
            .get(path.as_str())
            .map(|(value, revision)| Snapshot {
                value: value.clone(),
                revision: *revision,
            }))
    }

    fn list(&self, path: &NodePath) -> StoreResult<Vec<(String, Snapshot)>> {
        let nodes = self.nodes.read();
        let mut children = Vec::new();
        for (key, (value, revision)) in nodes.iter() {
            let node = NodePath::new(key.as_str());
            if !path.contains(&node) || node == *path {
                continue;
            }
            let remainder = &key[path.as_str().len() + 1..];
            // Direct children only.
            if remainder.contains('/') {
                continue;
            }
            children.push((
                remainder.to_owned(),
                Snapshot {
                    value: value.clone(),
                    revision: *revision,
                },
            ));
        }
        Ok(children)
    }

    fn write(&self, path: &NodePath, value: Value) -> StoreResult<u64> {
        self.check_denied(path)?;
        if let Some(error) = self.fail_next_write.lock().take() {
            return Err(error);
        }

        let revision = {
            let mut nodes = self.nodes.write();
            let revision = self.next_revision();
            nodes.insert(path.as_str().to_owned(), (value.clone(), revision));
            revision
        };
        self.notify(path, Some(value), revision);
        Ok(revision)
    }

    fn delete(&self, path: &NodePath) -> StoreResult<u64> {
        self.check_denied(path)?;
        if let Some(error) = self.fail_next_write.lock().take() {
            return Err(error);
        }

        let removed = self.nodes.write().remove(path.as_str()).is_some();
        if !removed {
            return Ok(self.current_revision());
        }
        let revision = self.next_revision();
        self.notify(path, None, revision);
        Ok(revision)
    }

    fn subscribe(&self, path: &NodePath) -> Receiver<RemoteChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push((path.clone(), tx));
        rx
    }

    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
