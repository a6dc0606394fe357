//! In-flight mutation tracking.

use crate::error::{EngageError, EngageResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tally_model::{EntityRef, KindClass, MutationKind, UserId};
use tracing::debug;

/// A registered in-flight mutation.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    /// The mutated entity.
    pub entity: EntityRef,
    /// The acting user.
    pub actor: UserId,
    /// The mutation kind.
    pub kind: MutationKind,
    /// The entity's local version when the mutation was submitted.
    pub local_version: u64,
    /// When the mutation was submitted.
    pub submitted_at: Instant,
}

/// Proof of an acquired in-flight slot.
///
/// The token is consumed by [`PendingOperationTracker::release`]; there is
/// no other way out of a slot, so a mutation can neither resolve twice nor
/// be forgotten while holding its slot.
#[derive(Debug)]
pub struct PendingToken {
    id: u64,
    entity: EntityRef,
    actor: UserId,
    class: KindClass,
}

impl PendingToken {
    /// The entity this token locks.
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// The acting user.
    pub fn actor(&self) -> &UserId {
        &self.actor
    }

    /// The locked kind-class.
    pub fn class(&self) -> KindClass {
        self.class
    }
}

/// How an in-flight mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    /// The remote transaction committed.
    Confirmed,
    /// The remote transaction failed and the local delta was reverted.
    Rejected,
}

struct Slot {
    token_id: u64,
    operation: PendingOperation,
}

/// Guarantees at most one in-flight mutation per (entity, actor,
/// kind-class).
///
/// The remote store's transaction primitive provides atomicity at the
/// storage layer; this tracker gives the local-state layer the same
/// guarantee before confirmation arrives. Process-local only, no
/// persistence. Overlapping requests are rejected, never queued, which
/// bounds in-flight work to one per slot.
#[derive(Default)]
pub struct PendingOperationTracker {
    slots: Mutex<HashMap<(EntityRef, UserId, KindClass), Slot>>,
    next_token: AtomicU64,
    /// Per-entity count of held slots, for the push-buffering decision.
    entity_counts: Mutex<HashMap<EntityRef, usize>>,
}

impl PendingOperationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the slot for `(entity, actor, kind-class)`.
    ///
    /// Fails with [`EngageError::ConcurrentMutation`] if the slot is held.
    /// `local_version` is the entity's version at submission time.
    pub fn try_acquire(
        &self,
        entity: EntityRef,
        actor: UserId,
        kind: MutationKind,
        local_version: u64,
    ) -> EngageResult<PendingToken> {
        let class = kind.class();
        let key = (entity.clone(), actor.clone(), class);
        let mut slots = self.slots.lock();

        if slots.contains_key(&key) {
            return Err(EngageError::ConcurrentMutation {
                entity,
                actor,
                class,
            });
        }

        let id = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        slots.insert(
            key,
            Slot {
                token_id: id,
                operation: PendingOperation {
                    entity: entity.clone(),
                    actor: actor.clone(),
                    kind,
                    local_version,
                    submitted_at: Instant::now(),
                },
            },
        );
        drop(slots);
        *self.entity_counts.lock().entry(entity.clone()).or_insert(0) += 1;

        Ok(PendingToken {
            id,
            entity,
            actor,
            class,
        })
    }

    /// Releases a slot, consuming the token.
    pub fn release(&self, token: PendingToken, outcome: PendingOutcome) {
        let key = (token.entity.clone(), token.actor.clone(), token.class);
        let mut slots = self.slots.lock();
        match slots.get(&key) {
            Some(slot) if slot.token_id == token.id => {
                slots.remove(&key);
            }
            _ => return,
        }
        drop(slots);

        let mut counts = self.entity_counts.lock();
        if let Some(count) = counts.get_mut(&token.entity) {
            *count -= 1;
            if *count == 0 {
                counts.remove(&token.entity);
            }
        }
        debug!(entity = %token.entity, actor = %token.actor, ?outcome, "pending operation resolved");
    }

    /// Returns true if any mutation is in flight for the entity.
    pub fn has_pending(&self, entity: &EntityRef) -> bool {
        self.entity_counts.lock().contains_key(entity)
    }

    /// Returns the number of held slots.
    pub fn pending_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns a snapshot of all in-flight operations.
    pub fn operations(&self) -> Vec<PendingOperation> {
        self.slots
            .lock()
            .values()
            .map(|slot| slot.operation.clone())
            .collect()
    }
}
