//! Comment records.

use crate::id::{CommentId, PostId, UserId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A comment on a post.
///
/// Immutable once created, except for explicit edit/delete operations
/// which replace or remove the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique comment identifier (store-generated).
    pub id: CommentId,
    /// The post this comment belongs to.
    pub post_id: PostId,
    /// The comment author.
    pub author_id: UserId,
    /// The comment body.
    pub text: String,
    /// Creation time, epoch milliseconds.
    pub created_at: u64,
    /// Last edit time, epoch milliseconds. None if never edited.
    pub edited_at: Option<u64>,
}

impl Comment {
    /// Creates a new comment stamped with the current time.
    pub fn new(
        id: CommentId,
        post_id: PostId,
        author_id: UserId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            post_id,
            author_id,
            text: text.into(),
            created_at: now_millis(),
            edited_at: None,
        }
    }

    /// Returns a copy with replaced text and an updated edit timestamp.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            edited_at: Some(now_millis()),
            ..self.clone()
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
