//! Reconciliation of local optimistic state with server truth.

use crate::graph::RelationshipGraphView;
use crate::mutator::LocalDelta;
use crate::shadow::{AdoptStatus, EngagementState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tally_model::{
    CounterState, EntityKind, EntityRef, FollowEdge, FollowerDocument, MutationKind, PostDocument,
    PostId, UserId,
};
use tracing::{debug, warn};

/// Authoritative entity state extracted from a server document or a
/// removal notification.
#[derive(Debug, Clone)]
pub struct RemoteEntityState {
    /// The entity the state belongs to.
    pub entity: EntityRef,
    /// The engagement counter carried by the document, if any.
    pub counter: Option<CounterState>,
    /// The comment counter carried by the document, if any.
    pub comment_count: Option<u64>,
    /// True if the entity was removed remotely.
    pub removed: bool,
    /// Server revision of the change.
    pub revision: u64,
}

impl RemoteEntityState {
    /// Extracts the engagement state of a post document.
    pub fn from_post_document(post: &PostId, doc: &PostDocument, revision: u64) -> Self {
        Self {
            entity: EntityRef::post(post),
            counter: Some(doc.like_counter(0)),
            comment_count: Some(doc.comment_count),
            removed: false,
            revision,
        }
    }

    /// Extracts the engagement state of a follower document.
    pub fn from_follower_document(user: &UserId, doc: &FollowerDocument, revision: u64) -> Self {
        Self {
            entity: EntityRef::user(user),
            counter: Some(doc.follower_counter(0)),
            comment_count: None,
            removed: false,
            revision,
        }
    }

    /// A change that carries no counter payload (e.g. a comment edit).
    pub fn revision_only(entity: EntityRef, revision: u64) -> Self {
        Self {
            entity,
            counter: None,
            comment_count: None,
            removed: false,
            revision,
        }
    }

    /// A remote removal of the entity.
    pub fn removal(entity: EntityRef, revision: u64) -> Self {
        Self {
            entity,
            counter: None,
            comment_count: None,
            removed: true,
            revision,
        }
    }
}

/// How a push update was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The update was adopted as truth.
    Applied,
    /// A mutation is in flight for the entity; the update was buffered.
    Buffered,
    /// The update's revision was not newer than the applied one; dropped.
    Stale,
    /// The change did not concern engagement state.
    Ignored,
}

/// Result of a reconciliation step.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileReport {
    /// Whether the state was applied (false for stale updates).
    pub applied: bool,
    /// Whether the local cache was discarded and must be refetched.
    pub needs_refetch: bool,
}

/// Merges locally-optimistic state with authoritative server state.
///
/// Ordering guarantee: local intent wins until the matching transaction
/// resolves, then server truth wins unconditionally. Per entity, updates
/// apply in increasing revision order; the rest are dropped, so counts
/// never regress due to network reordering.
pub struct ReconciliationEngine {
    state: Arc<EngagementState>,
    graph: Arc<RelationshipGraphView>,
    verify_counts: bool,
    max_buffered: usize,
    buffered: Mutex<HashMap<EntityRef, Vec<RemoteEntityState>>>,
}

impl ReconciliationEngine {
    /// Creates an engine over the shared shadow state and graph view.
    pub fn new(
        state: Arc<EngagementState>,
        graph: Arc<RelationshipGraphView>,
        verify_counts: bool,
        max_buffered: usize,
    ) -> Self {
        Self {
            state,
            graph,
            verify_counts,
            max_buffered,
            buffered: Mutex::new(HashMap::new()),
        }
    }

    /// Adopts authoritative server state.
    ///
    /// Stale updates are dropped silently (logged at debug level only).
    /// If count verification is enabled and the adopted counter disagrees
    /// with its membership set, the local entry is discarded and the
    /// caller must refetch.
    pub fn adopt(&self, update: &RemoteEntityState) -> ReconcileReport {
        let status = if update.removed {
            self.state.adopt_removed(&update.entity, update.revision)
        } else {
            self.state.adopt(
                &update.entity,
                update.counter.as_ref(),
                update.comment_count,
                update.revision,
            )
        };

        match status {
            AdoptStatus::Stale => {
                debug!(
                    entity = %update.entity,
                    revision = update.revision,
                    applied = self.state.applied_revision(&update.entity),
                    "stale update discarded"
                );
                ReconcileReport::default()
            }
            AdoptStatus::Applied { consistent } => {
                if update.entity.kind == EntityKind::User {
                    let user = UserId::new(update.entity.id.clone());
                    if update.removed {
                        self.graph.clear_followers(&user);
                    } else if let Some(counter) = &update.counter {
                        self.graph.replace_followers(&user, counter.members());
                    }
                }

                if self.verify_counts && !consistent {
                    warn!(
                        entity = %update.entity,
                        "count/membership mismatch after reconciliation; discarding local cache"
                    );
                    self.state.remove(&update.entity);
                    return ReconcileReport {
                        applied: true,
                        needs_refetch: true,
                    };
                }

                ReconcileReport {
                    applied: true,
                    needs_refetch: false,
                }
            }
        }
    }

    /// Handles a confirmed mutation: adopts the transaction's result and
    /// settles the follower-side mirror for relationship mutations.
    pub fn confirm(&self, delta: &LocalDelta, update: &RemoteEntityState) -> ReconcileReport {
        let report = self.adopt(update);
        match delta.kind {
            MutationKind::Follow => {
                self.graph.set_edge(&self.edge_of(delta), true);
            }
            MutationKind::Unfollow => {
                self.graph.set_edge(&self.edge_of(delta), false);
            }
            _ => {}
        }
        report
    }

    /// Handles a rejected mutation: reverts the optimistic delta so the
    /// local state is bit-for-bit the pre-mutation state.
    pub fn reject(&self, delta: &LocalDelta) {
        self.state.revert(delta);
        if delta.membership_changed {
            match delta.kind {
                MutationKind::Follow => {
                    self.graph.set_edge(&self.edge_of(delta), false);
                }
                MutationKind::Unfollow => {
                    self.graph.set_edge(&self.edge_of(delta), true);
                }
                _ => {}
            }
        }
    }

    /// Handles an entity that disappeared remotely while a mutation was
    /// in flight: local state is cleared, buffered updates are dropped.
    pub fn entity_missing(&self, entity: &EntityRef) {
        self.state.clear(entity);
        self.buffered.lock().remove(entity);
        if entity.kind == EntityKind::User {
            self.graph.clear_followers(&UserId::new(entity.id.clone()));
        }
    }

    /// Buffers a push update until the entity's in-flight mutations
    /// resolve, bounding the buffer per entity.
    pub fn buffer(&self, update: RemoteEntityState) {
        let mut buffered = self.buffered.lock();
        let queue = buffered.entry(update.entity.clone()).or_default();
        queue.push(update);
        if queue.len() > self.max_buffered {
            let dropped = queue.remove(0);
            debug!(entity = %dropped.entity, "buffered update evicted");
        }
    }

    /// Applies buffered updates for an entity in revision order.
    ///
    /// Returns the updates that were actually adopted, plus whether any
    /// adoption demanded a refetch.
    pub fn drain(&self, entity: &EntityRef) -> (Vec<RemoteEntityState>, bool) {
        let mut queue = match self.buffered.lock().remove(entity) {
            Some(queue) => queue,
            None => return (Vec::new(), false),
        };
        queue.sort_by_key(|update| update.revision);

        let mut applied = Vec::new();
        let mut needs_refetch = false;
        for update in queue {
            let report = self.adopt(&update);
            needs_refetch |= report.needs_refetch;
            if report.applied {
                applied.push(update);
            }
        }
        (applied, needs_refetch)
    }

    /// Returns the number of buffered updates for an entity.
    pub fn buffered_count(&self, entity: &EntityRef) -> usize {
        self.buffered
            .lock()
            .get(entity)
            .map_or(0, |queue| queue.len())
    }

    fn edge_of(&self, delta: &LocalDelta) -> FollowEdge {
        FollowEdge::new(delta.actor.clone(), UserId::new(delta.entity.id.clone()))
    }
}
