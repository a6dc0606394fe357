//! Identifiers for users, posts, comments and engagement entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user identifier (backend auth UID).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// A post identifier (backend node key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

/// A comment identifier (collision-resistant, store-generated).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Creates an identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(UserId);
string_id!(PostId);
string_id!(CommentId);

/// The kind of object an engagement entity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A likeable/commentable post.
    Post,
    /// A followable user.
    User,
}

/// Identifies a likeable, followable or commentable object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// The kind of entity.
    pub kind: EntityKind,
    /// The entity's unique identifier.
    pub id: String,
}

impl EntityRef {
    /// Creates an entity reference to a post.
    pub fn post(id: &PostId) -> Self {
        Self {
            kind: EntityKind::Post,
            id: id.as_str().to_owned(),
        }
    }

    /// Creates an entity reference to a user.
    pub fn user(id: &UserId) -> Self {
        Self {
            kind: EntityKind::User,
            id: id.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntityKind::Post => "post",
            EntityKind::User => "user",
        };
        write!(f, "{kind}:{}", self.id)
    }
}
