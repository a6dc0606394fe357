//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when talking to the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("document not found at {path}")]
    NotFound {
        /// The path that was addressed.
        path: String,
    },

    /// A transaction closure declined to commit.
    #[error("transaction aborted: {message}")]
    TransactionAborted {
        /// Why the transaction was aborted.
        message: String,
    },

    /// The backend rejected the operation.
    #[error("permission denied at {path}")]
    PermissionDenied {
        /// The path that was addressed.
        path: String,
    },

    /// The backend could not be reached or answered with a transient error.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
        /// Whether the caller may retry the operation.
        retryable: bool,
    },

    /// A document could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a transaction-aborted error.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::TransactionAborted {
            message: message.into(),
        }
    }

    /// Creates a permission-denied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    /// Creates a retryable unavailability error.
    pub fn unavailable_retryable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable unavailability error.
    pub fn unavailable_fatal(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the caller may retry the operation.
    ///
    /// The reconciler never retries on its own; this classification is
    /// surfaced so the presentation layer can offer a user-visible retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { retryable: true, .. })
    }

    /// Returns true if the error means the document is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
