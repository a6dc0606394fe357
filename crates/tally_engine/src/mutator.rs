//! Optimistic mutation application.

use crate::shadow::EngagementState;
use std::sync::Arc;
use tally_model::{EntityRef, FollowEdge, MutationKind, PostId, UserId};

/// The immediate local effect of an accepted user action.
///
/// Returned to the caller so the presentation layer can render the new
/// state instantly, and retained by the in-flight mutation so the
/// reconciler can revert it precisely if the remote transaction fails.
#[derive(Debug, Clone)]
pub struct LocalDelta {
    /// The mutated entity.
    pub entity: EntityRef,
    /// The acting user.
    pub actor: UserId,
    /// The mutation kind.
    pub kind: MutationKind,
    /// Whether the flip actually changed the actor's membership.
    pub membership_changed: bool,
    /// The shift applied to the comment counter (-1, 0 or +1).
    pub comment_delta: i8,
    /// Counter value before the mutation.
    pub count_before: u64,
    /// Counter value after the mutation.
    pub count_after: u64,
    /// The entity's local version after the mutation.
    pub local_version: u64,
}

/// Applies local state changes for user actions before remote
/// confirmation.
///
/// Completes synchronously and cheaply so UI feedback is instantaneous;
/// the only suspending step of a mutation is the remote store call that
/// follows. Callers must hold the in-flight slot for the mutation's
/// (entity, actor, kind-class) before applying.
pub struct OptimisticMutator {
    state: Arc<EngagementState>,
}

impl OptimisticMutator {
    /// Creates a mutator over the shared shadow state.
    pub fn new(state: Arc<EngagementState>) -> Self {
        Self { state }
    }

    /// Applies a like or unlike to a post's counter.
    pub fn apply_reaction(&self, post: &PostId, actor: &UserId, liked: bool) -> LocalDelta {
        let entity = EntityRef::post(post);
        let kind = if liked {
            MutationKind::Like
        } else {
            MutationKind::Unlike
        };
        let flip = self.state.flip_member(&entity, actor, liked);
        LocalDelta {
            entity,
            actor: actor.clone(),
            kind,
            membership_changed: flip.changed,
            comment_delta: 0,
            count_before: flip.count_before,
            count_after: flip.count_after,
            local_version: flip.version,
        }
    }

    /// Applies a follow or unfollow to the followee's follower counter.
    ///
    /// The follower-side mirror is the graph view's concern; this touches
    /// only the authoritative counter.
    pub fn apply_relationship(&self, edge: &FollowEdge, following: bool) -> LocalDelta {
        let entity = EntityRef::user(&edge.followee);
        let kind = if following {
            MutationKind::Follow
        } else {
            MutationKind::Unfollow
        };
        let flip = self.state.flip_member(&entity, &edge.follower, following);
        LocalDelta {
            entity,
            actor: edge.follower.clone(),
            kind,
            membership_changed: flip.changed,
            comment_delta: 0,
            count_before: flip.count_before,
            count_after: flip.count_after,
            local_version: flip.version,
        }
    }

    /// Applies a comment-count shift for a comment create/delete (or a
    /// zero shift for an edit).
    pub fn apply_commenting(&self, post: &PostId, author: &UserId, shift: i8) -> LocalDelta {
        let entity = EntityRef::post(post);
        let result = self.state.shift_comments(&entity, shift);
        LocalDelta {
            entity,
            actor: author.clone(),
            kind: MutationKind::Comment,
            membership_changed: false,
            comment_delta: shift,
            count_before: result.count_before,
            count_after: result.count_after,
            local_version: result.version,
        }
    }

    /// Reverts a delta, restoring the pre-mutation state.
    pub fn revert(&self, delta: &LocalDelta) {
        self.state.revert(delta);
    }
}
