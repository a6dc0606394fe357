//! Document addressing.

use std::fmt;

/// A slash-separated path addressing one document node.
///
/// Paths are relative to the store root, e.g. `posts/p1` or
/// `posts/p1/comments/c9`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(String);

impl NodePath {
    /// Creates a path from a string, trimming any surrounding slashes.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self(path.trim_matches('/').to_owned())
    }

    /// Returns the path extended by one child segment.
    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        let segment = segment.as_ref().trim_matches('/');
        if self.0.is_empty() {
            Self(segment.to_owned())
        } else {
            Self(format!("{}/{segment}", self.0))
        }
    }

    /// Returns the parent path, or None at the root.
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('/').map(|(parent, _)| Self(parent.to_owned()))
    }

    /// Returns the final path segment, or None for an empty path.
    pub fn key(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.rsplit('/').next().unwrap_or(&self.0))
        }
    }

    /// Returns true if `other` equals this path or is beneath it.
    ///
    /// The comparison is segment-aware: `posts/p1` does not contain
    /// `posts/p10`.
    pub fn contains(&self, other: &NodePath) -> bool {
        other.0 == self.0
            || (other.0.len() > self.0.len()
                && other.0.starts_with(&self.0)
                && other.0.as_bytes()[self.0.len()] == b'/')
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
