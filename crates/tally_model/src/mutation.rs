//! Mutation kinds and their concurrency kind-classes.

use serde::{Deserialize, Serialize};

/// A user-initiated engagement mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// Add the actor to a post's like set.
    Like,
    /// Remove the actor from a post's like set.
    Unlike,
    /// Add a follow edge from the actor to another user.
    Follow,
    /// Remove a follow edge from the actor to another user.
    Unfollow,
    /// Create, edit or delete a comment on a post.
    Comment,
}

impl MutationKind {
    /// Returns the kind-class this mutation contends in.
    ///
    /// Opposite actions (Like/Unlike, Follow/Unfollow) share a class so
    /// they compete for the same in-flight slot.
    pub fn class(&self) -> KindClass {
        match self {
            MutationKind::Like | MutationKind::Unlike => KindClass::Reaction,
            MutationKind::Follow | MutationKind::Unfollow => KindClass::Relationship,
            MutationKind::Comment => KindClass::Commenting,
        }
    }

    /// Returns true if this mutation adds membership rather than removing it.
    pub fn is_addition(&self) -> bool {
        matches!(
            self,
            MutationKind::Like | MutationKind::Follow | MutationKind::Comment
        )
    }
}

/// Grouping of opposite actions that contend for the same concurrency slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindClass {
    /// Like/Unlike on a post.
    Reaction,
    /// Follow/Unfollow between users.
    Relationship,
    /// Comment create/edit/delete on a post.
    Commenting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_actions_share_a_class() {
        assert_eq!(MutationKind::Like.class(), MutationKind::Unlike.class());
        assert_eq!(MutationKind::Follow.class(), MutationKind::Unfollow.class());
        assert_ne!(MutationKind::Like.class(), MutationKind::Follow.class());
        assert_ne!(MutationKind::Like.class(), MutationKind::Comment.class());
    }

    #[test]
    fn addition_direction() {
        assert!(MutationKind::Like.is_addition());
        assert!(MutationKind::Follow.is_addition());
        assert!(!MutationKind::Unlike.is_addition());
        assert!(!MutationKind::Unfollow.is_addition());
    }
}
