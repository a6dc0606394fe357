//! Local shadow of reconciled engagement state.

use crate::mutator::LocalDelta;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tally_model::{CounterState, EntityRef, UserId};

/// A read-only view of one entity's reconciled state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityView {
    /// The engagement counter (likes for posts, followers for users).
    pub count: u64,
    /// The comment counter (posts only, zero otherwise).
    pub comment_count: u64,
    /// Local version, bumped on every change.
    pub version: u64,
    /// Last applied server revision (zero if never adopted).
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
struct EntityShadow {
    counter: CounterState,
    comment_count: u64,
    revision: u64,
}

/// The outcome of adopting authoritative server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdoptStatus {
    /// The state was applied. `consistent` reports whether the adopted
    /// counter matched its membership set.
    Applied {
        /// Whether `count == members.len()` held for the adopted counter.
        consistent: bool,
    },
    /// The update's revision was not newer than the applied one.
    Stale,
}

/// The result of an optimistic membership flip.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlipResult {
    pub changed: bool,
    pub count_before: u64,
    pub count_after: u64,
    pub version: u64,
}

/// The result of an optimistic comment-count shift.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShiftResult {
    pub count_before: u64,
    pub count_after: u64,
    pub version: u64,
}

/// In-memory shadow of the reconciled state per entity.
///
/// Written only by the optimistic mutator and the reconciliation engine;
/// all other components read. The shadow is ephemeral: durable truth
/// lives in the remote store, and any entry can be discarded and
/// refetched.
#[derive(Default)]
pub struct EngagementState {
    entries: RwLock<HashMap<EntityRef, EntityShadow>>,
}

impl EngagementState {
    /// Creates an empty shadow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the engagement count, or None if the entity is unknown.
    pub fn count(&self, entity: &EntityRef) -> Option<u64> {
        self.entries.read().get(entity).map(|s| s.counter.count())
    }

    /// Returns true if the user is a member of the entity's counter set.
    pub fn is_member(&self, entity: &EntityRef, user: &UserId) -> bool {
        self.entries
            .read()
            .get(entity)
            .is_some_and(|s| s.counter.contains(user))
    }

    /// Returns the comment count, or None if the entity is unknown.
    pub fn comment_count(&self, entity: &EntityRef) -> Option<u64> {
        self.entries.read().get(entity).map(|s| s.comment_count)
    }

    /// Returns the entity's local version (zero if unknown).
    pub fn version(&self, entity: &EntityRef) -> u64 {
        self.entries
            .read()
            .get(entity)
            .map(|s| s.counter.version())
            .unwrap_or(0)
    }

    /// Returns the last applied server revision (zero if never adopted).
    pub fn applied_revision(&self, entity: &EntityRef) -> u64 {
        self.entries
            .read()
            .get(entity)
            .map(|s| s.revision)
            .unwrap_or(0)
    }

    /// Returns a copy of the entity's member set, if known.
    pub fn members(&self, entity: &EntityRef) -> Option<BTreeSet<UserId>> {
        self.entries
            .read()
            .get(entity)
            .map(|s| s.counter.members().clone())
    }

    /// Returns a read-only view of the entity, if known.
    pub fn view(&self, entity: &EntityRef) -> Option<EntityView> {
        self.entries.read().get(entity).map(|s| EntityView {
            count: s.counter.count(),
            comment_count: s.comment_count,
            version: s.counter.version(),
            revision: s.revision,
        })
    }

    /// Flips the actor's membership optimistically.
    pub(crate) fn flip_member(&self, entity: &EntityRef, actor: &UserId, add: bool) -> FlipResult {
        let mut entries = self.entries.write();
        let shadow = entries.entry(entity.clone()).or_default();
        let count_before = shadow.counter.count();
        let changed = if add {
            shadow.counter.add_member(actor.clone())
        } else {
            shadow.counter.remove_member(actor)
        };
        FlipResult {
            changed,
            count_before,
            count_after: shadow.counter.count(),
            version: shadow.counter.version(),
        }
    }

    /// Shifts the comment counter optimistically.
    pub(crate) fn shift_comments(&self, entity: &EntityRef, delta: i8) -> ShiftResult {
        let mut entries = self.entries.write();
        let shadow = entries.entry(entity.clone()).or_default();
        let count_before = shadow.comment_count;
        shadow.comment_count = apply_shift(shadow.comment_count, delta);
        shadow.counter.bump_version();
        ShiftResult {
            count_before,
            count_after: shadow.comment_count,
            version: shadow.counter.version(),
        }
    }

    /// Adopts authoritative server state for an entity.
    ///
    /// Updates whose revision is not newer than the applied revision are
    /// reported [`AdoptStatus::Stale`] and change nothing.
    pub(crate) fn adopt(
        &self,
        entity: &EntityRef,
        counter: Option<&CounterState>,
        comment_count: Option<u64>,
        revision: u64,
    ) -> AdoptStatus {
        let mut entries = self.entries.write();
        let shadow = entries.entry(entity.clone()).or_default();
        if shadow.revision != 0 && revision <= shadow.revision {
            return AdoptStatus::Stale;
        }

        let mut consistent = true;
        if let Some(counter) = counter {
            shadow.counter.adopt(counter);
            consistent = counter.is_consistent();
        }
        if let Some(comments) = comment_count {
            shadow.comment_count = comments;
        }
        shadow.revision = revision;
        AdoptStatus::Applied { consistent }
    }

    /// Records a remote removal: membership and counters are cleared but
    /// the revision is kept so older updates stay stale.
    pub(crate) fn adopt_removed(&self, entity: &EntityRef, revision: u64) -> AdoptStatus {
        let mut entries = self.entries.write();
        let shadow = entries.entry(entity.clone()).or_default();
        if shadow.revision != 0 && revision <= shadow.revision {
            return AdoptStatus::Stale;
        }
        let empty = CounterState::new();
        shadow.counter.adopt(&empty);
        shadow.comment_count = 0;
        shadow.revision = revision;
        AdoptStatus::Applied { consistent: true }
    }

    /// Clears an entity's local state, keeping its revision watermark.
    pub(crate) fn clear(&self, entity: &EntityRef) {
        let mut entries = self.entries.write();
        if let Some(shadow) = entries.get_mut(entity) {
            let empty = CounterState::new();
            shadow.counter.adopt(&empty);
            shadow.comment_count = 0;
        }
    }

    /// Discards an entity's shadow entirely.
    pub(crate) fn remove(&self, entity: &EntityRef) {
        self.entries.write().remove(entity);
    }

    /// Reverts an optimistic delta: the inverse membership flip and
    /// comment-count shift.
    pub(crate) fn revert(&self, delta: &LocalDelta) {
        let mut entries = self.entries.write();
        let shadow = entries.entry(delta.entity.clone()).or_default();
        if delta.membership_changed {
            if delta.kind.is_addition() {
                shadow.counter.remove_member(&delta.actor);
            } else {
                shadow.counter.add_member(delta.actor.clone());
            }
        }
        if delta.comment_delta != 0 {
            shadow.comment_count = apply_shift(shadow.comment_count, -delta.comment_delta);
            shadow.counter.bump_version();
        }
    }
}

fn apply_shift(count: u64, delta: i8) -> u64 {
    if delta >= 0 {
        count + delta as u64
    } else {
        count.saturating_sub(delta.unsigned_abs() as u64)
    }
}
