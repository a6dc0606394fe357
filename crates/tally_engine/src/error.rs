//! Error types for the engagement engine.

use tally_model::{CommentId, EntityRef, KindClass, PostId, UserId};
use tally_store::StoreError;
use thiserror::Error;

/// Result type for engagement operations.
pub type EngageResult<T> = Result<T, EngageError>;

/// Errors that can occur while mutating or reconciling engagement state.
#[derive(Debug, Error)]
pub enum EngageError {
    /// A mutation for the same (entity, actor, kind-class) slot is already
    /// in flight. The duplicate user action must be ignored, not queued.
    #[error("mutation already in flight for {entity} by {actor} ({class:?})")]
    ConcurrentMutation {
        /// The contended entity.
        entity: EntityRef,
        /// The acting user.
        actor: UserId,
        /// The contended kind-class.
        class: KindClass,
    },

    /// The remote transaction failed; the optimistic delta was rolled back.
    #[error("remote transaction failed: {source}")]
    RemoteTransaction {
        /// The underlying store failure.
        #[source]
        source: StoreError,
    },

    /// The entity was deleted remotely while a mutation was in flight.
    #[error("entity not found: {entity}")]
    NotFound {
        /// The entity that is gone.
        entity: EntityRef,
    },

    /// The addressed comment no longer exists on its post.
    #[error("comment {comment} not found on post {post}")]
    CommentNotFound {
        /// The comment's post.
        post: PostId,
        /// The missing comment.
        comment: CommentId,
    },

    /// A remote document did not match the expected schema.
    #[error("malformed document at {path}: {message}")]
    MalformedDocument {
        /// The document path.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// A store error outside a mutation (reads, hydration, subscriptions).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngageError {
    /// Creates a rolled-back remote transaction error.
    pub fn remote(source: StoreError) -> Self {
        Self::RemoteTransaction { source }
    }

    /// Creates a not-found error.
    pub fn not_found(entity: EntityRef) -> Self {
        Self::NotFound { entity }
    }

    /// Creates a malformed-document error.
    pub fn malformed(path: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if the failed operation may be retried by the user.
    ///
    /// The engine never retries on its own: a hidden retry loop could
    /// double-apply a mutation.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngageError::RemoteTransaction { source } => source.is_retryable(),
            EngageError::Store(source) => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for a duplicate in-flight mutation.
    pub fn is_concurrent(&self) -> bool {
        matches!(self, EngageError::ConcurrentMutation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_model::PostId;

    #[test]
    fn retryable_classification() {
        let err = EngageError::remote(StoreError::unavailable_retryable("timeout"));
        assert!(err.is_retryable());

        let err = EngageError::remote(StoreError::permission_denied("posts/p1"));
        assert!(!err.is_retryable());

        let err = EngageError::not_found(EntityRef::post(&PostId::from("p1")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn concurrent_classification() {
        let err = EngageError::ConcurrentMutation {
            entity: EntityRef::post(&PostId::from("p1")),
            actor: UserId::from("u1"),
            class: KindClass::Reaction,
        };
        assert!(err.is_concurrent());
        assert!(err.to_string().contains("post:p1"));
        assert!(err.to_string().contains("u1"));
    }
}
