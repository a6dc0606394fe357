//! Membership-backed engagement counter state.

use crate::id::UserId;
use std::collections::BTreeSet;

/// The reconciled state of one engagement counter.
///
/// Tracks the denormalized `count` alongside the membership set that
/// produced it, plus a locally assigned version used to detect staleness.
///
/// # Invariants
///
/// - `count == members.len()` after reconciliation completes. The invariant
///   is deliberately not enforced mid-flight: server documents may carry a
///   diverged counter, and [`CounterState::is_consistent`] is how the
///   reconciler detects that after adoption.
/// - `version` only ever increases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterState {
    count: u64,
    members: BTreeSet<UserId>,
    version: u64,
}

impl CounterState {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter from raw parts, as adopted from a server document.
    ///
    /// The count is taken verbatim; it may disagree with the member set.
    pub fn from_parts(count: u64, members: BTreeSet<UserId>, version: u64) -> Self {
        Self {
            count,
            members,
            version,
        }
    }

    /// Returns the denormalized count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the local version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the user is a member.
    pub fn contains(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Returns the membership set.
    pub fn members(&self) -> &BTreeSet<UserId> {
        &self.members
    }

    /// Adds a member, incrementing the count and bumping the version.
    ///
    /// Returns false (and changes nothing) if the user was already a member.
    pub fn add_member(&mut self, user: UserId) -> bool {
        if !self.members.insert(user) {
            return false;
        }
        self.count += 1;
        self.version += 1;
        true
    }

    /// Removes a member, decrementing the count and bumping the version.
    ///
    /// Returns false (and changes nothing) if the user was not a member.
    pub fn remove_member(&mut self, user: &UserId) -> bool {
        if !self.members.remove(user) {
            return false;
        }
        self.count = self.count.saturating_sub(1);
        self.version += 1;
        true
    }

    /// Returns true if the denormalized count matches the membership set.
    pub fn is_consistent(&self) -> bool {
        self.count == self.members.len() as u64
    }

    /// Adopts another counter's count and members, keeping the version
    /// monotonic.
    pub fn adopt(&mut self, other: &CounterState) {
        self.count = other.count;
        self.members = other.members.clone();
        self.version = self.version.max(other.version) + 1;
    }

    /// Bumps the version without touching count or membership.
    ///
    /// Used when a sibling field of the same entity changes.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}
