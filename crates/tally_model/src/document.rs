//! Remote document schemas.
//!
//! Each engagement entity is an addressable JSON document keyed by its ID,
//! with integer counters and boolean-valued membership maps. Field names
//! follow the backend's node layout; the counter fields are authoritative
//! and are confirmed/corrected via atomic transactions, with the membership
//! maps as the recomputation source.

use crate::comment::Comment;
use crate::counter::CounterState;
use crate::id::{CommentId, PostId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A post document: authoring fields plus engagement counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostDocument {
    /// The post author's user ID.
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub author_id: Option<UserId>,
    /// The post caption.
    pub caption: String,
    /// Authoritative like counter.
    #[serde(rename = "likeCount")]
    pub like_count: u64,
    /// Membership map of users who liked the post.
    #[serde(rename = "likedBy")]
    pub liked_by: BTreeMap<String, bool>,
    /// Authoritative comment counter.
    #[serde(rename = "commentCount")]
    pub comment_count: u64,
    /// Creation time, epoch milliseconds.
    pub timestamp: u64,
}

impl PostDocument {
    /// Sets the actor's like membership, keeping the counter in step.
    ///
    /// Returns false (and changes nothing) if the membership already had
    /// the requested state, which makes replayed transactions idempotent.
    pub fn set_liked(&mut self, user: &UserId, liked: bool) -> bool {
        if liked {
            if self
                .liked_by
                .insert(user.as_str().to_owned(), true)
                .is_some()
            {
                return false;
            }
            self.like_count += 1;
        } else {
            if self.liked_by.remove(user.as_str()).is_none() {
                return false;
            }
            self.like_count = self.like_count.saturating_sub(1);
        }
        true
    }

    /// Builds the like counter state carried by this document.
    pub fn like_counter(&self, version: u64) -> CounterState {
        let members = self.liked_by.keys().map(|k| UserId::new(k.clone())).collect();
        CounterState::from_parts(self.like_count, members, version)
    }

    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserializes from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// The followee-side relationship document: the authoritative follower
/// counter plus the follower membership map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerDocument {
    /// Authoritative follower counter.
    #[serde(rename = "followerCount")]
    pub follower_count: u64,
    /// Membership map of followers.
    pub followers: BTreeMap<String, bool>,
}

impl FollowerDocument {
    /// Sets a follower's membership, keeping the counter in step.
    ///
    /// Returns false (and changes nothing) if the membership already had
    /// the requested state.
    pub fn set_follower(&mut self, user: &UserId, following: bool) -> bool {
        if following {
            if self
                .followers
                .insert(user.as_str().to_owned(), true)
                .is_some()
            {
                return false;
            }
            self.follower_count += 1;
        } else {
            if self.followers.remove(user.as_str()).is_none() {
                return false;
            }
            self.follower_count = self.follower_count.saturating_sub(1);
        }
        true
    }

    /// Builds the follower counter state carried by this document.
    pub fn follower_counter(&self, version: u64) -> CounterState {
        let members = self.followers.keys().map(|k| UserId::new(k.clone())).collect();
        CounterState::from_parts(self.follower_count, members, version)
    }

    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserializes from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// A comment document, stored as a child node under its post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentDocument {
    /// The comment body.
    #[serde(rename = "commentText")]
    pub text: String,
    /// The comment author's user ID.
    #[serde(rename = "userId")]
    pub author_id: UserId,
    /// Creation time, epoch milliseconds.
    pub timestamp: u64,
    /// Last edit time, epoch milliseconds.
    #[serde(rename = "editedAt", skip_serializing_if = "Option::is_none", default)]
    pub edited_at: Option<u64>,
}

impl CommentDocument {
    /// Builds a document from a comment record.
    pub fn from_comment(comment: &Comment) -> Self {
        Self {
            text: comment.text.clone(),
            author_id: comment.author_id.clone(),
            timestamp: comment.created_at,
            edited_at: comment.edited_at,
        }
    }

    /// Reassembles the comment record this document represents.
    pub fn into_comment(self, id: CommentId, post_id: PostId) -> Comment {
        Comment {
            id,
            post_id,
            author_id: self.author_id,
            text: self.text,
            created_at: self.timestamp,
            edited_at: self.edited_at,
        }
    }

    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserializes from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// A user profile document.
///
/// Carried for hydration fixtures; the engagement engine itself only
/// touches relationship documents. `user_status` is maintained by the
/// backend's moderation tooling and is inert here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDocument {
    /// Display name.
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Profile bio.
    #[serde(rename = "userBio")]
    pub user_bio: String,
    /// Account status ("active" or "deactivated").
    #[serde(rename = "userStatus")]
    pub user_status: String,
    /// Account creation time, epoch milliseconds.
    #[serde(rename = "userCreatedAt")]
    pub created_at: u64,
}

impl UserDocument {
    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserializes from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_document_field_names() {
        let mut doc = PostDocument {
            author_id: Some(UserId::from("u1")),
            caption: "hello".into(),
            timestamp: 1700000000000,
            ..PostDocument::default()
        };
        doc.set_liked(&UserId::from("u2"), true);

        let value = doc.to_value().unwrap();
        assert_eq!(value["likeCount"], 1);
        assert_eq!(value["likedBy"]["u2"], true);
        assert_eq!(value["commentCount"], 0);
        assert_eq!(value["userId"], "u1");
    }

    #[test]
    fn post_document_tolerates_missing_counters() {
        // Older documents lack likeCount/commentCount entirely.
        let value = serde_json::json!({ "caption": "bare", "userId": "u1" });
        let doc = PostDocument::from_value(&value).unwrap();

        assert_eq!(doc.like_count, 0);
        assert_eq!(doc.comment_count, 0);
        assert!(doc.liked_by.is_empty());
    }

    #[test]
    fn set_liked_is_idempotent() {
        let mut doc = PostDocument::default();

        assert!(doc.set_liked(&UserId::from("u1"), true));
        assert!(!doc.set_liked(&UserId::from("u1"), true));
        assert_eq!(doc.like_count, 1);

        assert!(doc.set_liked(&UserId::from("u1"), false));
        assert!(!doc.set_liked(&UserId::from("u1"), false));
        assert_eq!(doc.like_count, 0);
    }

    #[test]
    fn like_counter_reflects_membership() {
        let mut doc = PostDocument::default();
        doc.set_liked(&UserId::from("u1"), true);
        doc.set_liked(&UserId::from("u2"), true);

        let counter = doc.like_counter(7);
        assert_eq!(counter.count(), 2);
        assert_eq!(counter.version(), 7);
        assert!(counter.contains(&UserId::from("u1")));
        assert!(counter.is_consistent());
    }

    #[test]
    fn follower_document_roundtrip() {
        let mut doc = FollowerDocument::default();
        doc.set_follower(&UserId::from("u9"), true);

        let value = doc.to_value().unwrap();
        assert_eq!(value["followerCount"], 1);
        assert_eq!(value["followers"]["u9"], true);

        let back = FollowerDocument::from_value(&value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn comment_document_conversion() {
        let comment = Comment::new(
            CommentId::from("c1"),
            PostId::from("p1"),
            UserId::from("u1"),
            "nice",
        );

        let doc = CommentDocument::from_comment(&comment);
        assert_eq!(doc.text, "nice");
        assert_eq!(doc.timestamp, comment.created_at);

        let back = doc.into_comment(CommentId::from("c1"), PostId::from("p1"));
        assert_eq!(back, comment);
    }
}
