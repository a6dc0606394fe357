//! Configuration for the engagement engine.

use tally_model::{CommentId, PostId, UserId};
use tally_store::NodePath;

/// Configuration for an [`EngagementClient`](crate::EngagementClient).
///
/// The path scheme defaults mirror the backend's node layout: post
/// documents under `posts`, comments as child nodes of their post,
/// follower documents under `followers`, and the follower-side mirror
/// entries under `following`.
#[derive(Debug, Clone)]
pub struct EngageConfig {
    /// Root node for post documents.
    pub posts_root: String,
    /// Child key for a post's comments.
    pub comments_key: String,
    /// Root node for followee-side relationship documents.
    pub followers_root: String,
    /// Root node for follower-side mirror entries.
    pub following_root: String,
    /// Root node for user profile documents.
    pub users_root: String,
    /// Maximum number of events retained by the event feed.
    pub event_history: usize,
    /// Maximum buffered push updates per entity while a mutation is in
    /// flight; the oldest are dropped beyond this.
    pub max_buffered_updates: usize,
    /// Whether to verify `count == members.len()` after reconciliation
    /// and repair mismatches by discard + refetch.
    pub verify_counts: bool,
}

impl EngageConfig {
    /// Creates a configuration with the default path scheme.
    pub fn new() -> Self {
        Self {
            posts_root: "posts".into(),
            comments_key: "comments".into(),
            followers_root: "followers".into(),
            following_root: "following".into(),
            users_root: "users".into(),
            event_history: 1024,
            max_buffered_updates: 64,
            verify_counts: true,
        }
    }

    /// Sets the event-feed history bound.
    pub fn with_event_history(mut self, bound: usize) -> Self {
        self.event_history = bound;
        self
    }

    /// Sets the per-entity buffered-update bound.
    pub fn with_max_buffered_updates(mut self, bound: usize) -> Self {
        self.max_buffered_updates = bound;
        self
    }

    /// Enables or disables post-reconciliation count verification.
    pub fn with_verify_counts(mut self, verify: bool) -> Self {
        self.verify_counts = verify;
        self
    }

    /// Path of a post document.
    pub fn post_path(&self, post: &PostId) -> NodePath {
        NodePath::new(&self.posts_root).child(post.as_str())
    }

    /// Path of a comment document under its post.
    pub fn comment_path(&self, post: &PostId, comment: &CommentId) -> NodePath {
        self.post_path(post)
            .child(&self.comments_key)
            .child(comment.as_str())
    }

    /// Path of a post's comments node.
    pub fn comments_path(&self, post: &PostId) -> NodePath {
        self.post_path(post).child(&self.comments_key)
    }

    /// Path of a followee-side relationship document.
    pub fn followers_path(&self, user: &UserId) -> NodePath {
        NodePath::new(&self.followers_root).child(user.as_str())
    }

    /// Path of a follower's mirror node.
    pub fn following_path(&self, follower: &UserId) -> NodePath {
        NodePath::new(&self.following_root).child(follower.as_str())
    }

    /// Path of one follower-side mirror entry.
    pub fn following_entry_path(&self, follower: &UserId, followee: &UserId) -> NodePath {
        self.following_path(follower).child(followee.as_str())
    }

    /// Path of a user profile document.
    pub fn user_path(&self, user: &UserId) -> NodePath {
        NodePath::new(&self.users_root).child(user.as_str())
    }
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self::new()
    }
}
