//! Derived follower/following view.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tally_model::{FollowEdge, UserId};

#[derive(Default)]
struct GraphInner {
    followers: HashMap<UserId, BTreeSet<UserId>>,
    following: HashMap<UserId, BTreeSet<UserId>>,
}

/// Read-model over the reconciled follow-edge set.
///
/// Updated incrementally on each reconciliation event; a full replace is
/// used only for cold-start population. Reads never block writers beyond
/// the read lock itself.
#[derive(Default)]
pub struct RelationshipGraphView {
    inner: RwLock<GraphInner>,
}

impl RelationshipGraphView {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `follower` follows `followee`.
    pub fn is_following(&self, follower: &UserId, followee: &UserId) -> bool {
        self.inner
            .read()
            .following
            .get(follower)
            .is_some_and(|set| set.contains(followee))
    }

    /// Returns the user's follower count.
    pub fn follower_count(&self, user: &UserId) -> u64 {
        self.inner
            .read()
            .followers
            .get(user)
            .map_or(0, |set| set.len() as u64)
    }

    /// Returns how many users this user follows.
    pub fn following_count(&self, user: &UserId) -> u64 {
        self.inner
            .read()
            .following
            .get(user)
            .map_or(0, |set| set.len() as u64)
    }

    /// Returns a copy of the user's follower set.
    pub fn followers_of(&self, user: &UserId) -> BTreeSet<UserId> {
        self.inner
            .read()
            .followers
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a copy of the set of users this user follows.
    pub fn following_of(&self, user: &UserId) -> BTreeSet<UserId> {
        self.inner
            .read()
            .following
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Adds or removes a single edge, updating both directions.
    pub(crate) fn set_edge(&self, edge: &FollowEdge, present: bool) -> bool {
        let mut inner = self.inner.write();
        let changed = if present {
            inner
                .following
                .entry(edge.follower.clone())
                .or_default()
                .insert(edge.followee.clone())
        } else {
            remove_entry(&mut inner.following, &edge.follower, &edge.followee)
        };
        if present {
            inner
                .followers
                .entry(edge.followee.clone())
                .or_default()
                .insert(edge.follower.clone());
        } else {
            remove_entry(&mut inner.followers, &edge.followee, &edge.follower);
        }
        changed
    }

    /// Replaces a user's follower set with reconciled server membership.
    ///
    /// The reverse `following` entries are fixed up from the diff between
    /// the old and new sets.
    pub(crate) fn replace_followers(&self, user: &UserId, members: &BTreeSet<UserId>) {
        let mut inner = self.inner.write();
        let old = inner.followers.get(user).cloned().unwrap_or_default();

        for removed in old.difference(members) {
            remove_entry(&mut inner.following, removed, user);
        }
        for added in members.difference(&old) {
            inner
                .following
                .entry(added.clone())
                .or_default()
                .insert(user.clone());
        }

        if members.is_empty() {
            inner.followers.remove(user);
        } else {
            inner.followers.insert(user.clone(), members.clone());
        }
    }

    /// Replaces the set of users someone follows (cold-start population).
    pub(crate) fn replace_following(&self, user: &UserId, members: &BTreeSet<UserId>) {
        let mut inner = self.inner.write();
        let old = inner.following.get(user).cloned().unwrap_or_default();

        for removed in old.difference(members) {
            remove_entry(&mut inner.followers, removed, user);
        }
        for added in members.difference(&old) {
            inner
                .followers
                .entry(added.clone())
                .or_default()
                .insert(user.clone());
        }

        if members.is_empty() {
            inner.following.remove(user);
        } else {
            inner.following.insert(user.clone(), members.clone());
        }
    }

    /// Drops everything known about a user's follower side.
    pub(crate) fn clear_followers(&self, user: &UserId) {
        self.replace_followers(user, &BTreeSet::new());
    }
}

fn remove_entry(
    map: &mut HashMap<UserId, BTreeSet<UserId>>,
    key: &UserId,
    value: &UserId,
) -> bool {
    match map.get_mut(key) {
        Some(set) => {
            let removed = set.remove(value);
            if set.is_empty() {
                map.remove(key);
            }
            removed
        }
        None => false,
    }
}
