//! Event feed for observing engagement state changes.
//!
//! The feed is how the presentation layer receives the "immediate
//! optimistic state plus eventual confirmation/rollback" contract:
//! every accepted action emits an optimistic event at once, followed by
//! exactly one confirmed or rolled-back event when the remote transaction
//! resolves. Authoritative push updates surface as remote-update events.

use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};
use tally_model::{EntityRef, MutationKind, UserId};

/// Which stage of a mutation's lifecycle an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// A local optimistic change was applied.
    Optimistic,
    /// The remote transaction confirmed; server truth adopted.
    Confirmed,
    /// The remote transaction failed; the optimistic change was reverted.
    RolledBack,
    /// An authoritative push update was applied.
    RemoteUpdate,
}

/// A single engagement state change.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementEvent {
    /// The affected entity.
    pub entity: EntityRef,
    /// The acting user, when the event stems from a local mutation.
    pub actor: Option<UserId>,
    /// The mutation kind, when the event stems from a local mutation.
    pub kind: Option<MutationKind>,
    /// Lifecycle stage.
    pub phase: EventPhase,
    /// The entity's engagement count after the event.
    pub count: u64,
    /// The entity's local version after the event.
    pub version: u64,
    /// The surfaced error message for rollbacks.
    pub error: Option<String>,
}

/// A feed that distributes engagement events to subscribers.
///
/// Events are emitted in application order, cloned to each active
/// subscriber, and kept in a bounded history for late inspection.
pub struct EventFeed {
    subscribers: RwLock<Vec<Sender<EngagementEvent>>>,
    history: RwLock<Vec<EngagementEvent>>,
    max_history: usize,
}

impl EventFeed {
    /// Creates a feed with the given history bound.
    pub fn new(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<EngagementEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EngagementEvent) {
        {
            let mut history = self.history.write();
            history.push(event.clone());
            if history.len() > self.max_history {
                let excess = history.len() - self.max_history;
                history.drain(0..excess);
            }
        }

        // Drop disconnected subscribers as a side effect.
        self.subscribers
            .write()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the most recent events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<EngagementEvent> {
        let history = self.history.read();
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
