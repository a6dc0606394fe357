//! Property-based test generators using proptest.

use proptest::prelude::*;
use std::collections::BTreeSet;
use tally_model::{PostId, UserId};

/// Strategy for generating user IDs from a small pool, so that
/// membership collisions actually happen.
pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    (0u8..16).prop_map(|n| UserId::new(format!("user-{n}")))
}

/// Strategy for generating post IDs.
pub fn post_id_strategy() -> impl Strategy<Value = PostId> {
    (0u8..8).prop_map(|n| PostId::new(format!("post-{n}")))
}

/// Strategy for generating member sets drawn from the user pool.
pub fn member_set_strategy(max_size: usize) -> impl Strategy<Value = BTreeSet<UserId>> {
    prop::collection::btree_set(user_id_strategy(), 0..=max_size)
}

/// Strategy for a shuffled sequence of the revisions `1..=len`.
///
/// Useful for checking that reconciliation converges regardless of the
/// arrival order of updates.
pub fn shuffled_revisions_strategy(len: u64) -> impl Strategy<Value = Vec<u64>> {
    Just((1..=len).collect::<Vec<u64>>()).prop_shuffle()
}
