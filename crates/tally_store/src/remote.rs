//! Remote store trait.

use crate::error::StoreResult;
use crate::path::NodePath;
use serde_json::Value;
use std::sync::mpsc::Receiver;

/// A one-shot snapshot of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The document value.
    pub value: Value,
    /// Store-assigned revision at which the value was committed.
    pub revision: u64,
}

/// The result of a committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    /// The value the transaction committed.
    pub value: Value,
    /// Store-assigned revision of the commit.
    pub revision: u64,
}

/// Decision returned by a transaction closure.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    /// Commit the given value at the path.
    Commit(Value),
    /// Abort because the document does not exist; surfaces as
    /// [`StoreError::NotFound`](crate::StoreError::NotFound).
    AbortMissing,
    /// Abort, leaving the document unchanged.
    Abort,
}

/// A push update delivered to a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    /// The document that changed.
    pub path: NodePath,
    /// The new value, or None if the document was deleted.
    pub value: Option<Value>,
    /// Store-assigned revision of the change.
    pub revision: u64,
}

/// A key-value document store with per-path atomic transactions and
/// change subscriptions.
///
/// This trait abstracts the vendor backend, allowing for different
/// implementations (realtime database SDK, in-memory for testing).
/// Implementations assign a monotonically increasing revision to every
/// committed change; the reconciler orders updates by it.
pub trait RemoteStore: Send + Sync {
    /// Runs an atomic read-modify-write on a single document.
    ///
    /// The closure receives the current value (None if absent) and decides
    /// whether to commit a new value or abort. It may be invoked more than
    /// once under contention, so it must be side-effect free.
    fn transact(
        &self,
        path: &NodePath,
        f: &mut dyn FnMut(Option<&Value>) -> TransactionOutcome,
    ) -> StoreResult<Committed>;

    /// Fetches a document once. Returns None if it does not exist.
    fn read(&self, path: &NodePath) -> StoreResult<Option<Snapshot>>;

    /// Enumerates the direct children of a node (a subtree read).
    ///
    /// Returns `(key, snapshot)` pairs for every child document.
    fn list(&self, path: &NodePath) -> StoreResult<Vec<(String, Snapshot)>>;

    /// Unconditionally overwrites a document. Returns the commit revision.
    fn write(&self, path: &NodePath, value: Value) -> StoreResult<u64>;

    /// Removes a document. Returns the commit revision.
    ///
    /// Removing an absent document succeeds without effect.
    fn delete(&self, path: &NodePath) -> StoreResult<u64>;

    /// Subscribes to changes at the path or beneath it.
    ///
    /// The receiver is dropped from the fan-out once disconnected.
    fn subscribe(&self, path: &NodePath) -> Receiver<RemoteChange>;

    /// Generates a collision-resistant identifier for a new document.
    fn generate_id(&self) -> String;
}
