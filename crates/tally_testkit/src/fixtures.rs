//! Seeded store fixtures.
//!
//! Provides convenience helpers for populating a [`MemoryRemoteStore`]
//! with posts, comments, followers and user profiles laid out under the
//! default path scheme (`posts`, `followers`, `following`, `users`).

use std::collections::BTreeMap;
use std::sync::Arc;
use tally_model::{
    Comment, CommentDocument, CommentId, FollowerDocument, PostDocument, PostId, UserDocument,
    UserId,
};
use tally_store::{MemoryRemoteStore, NodePath, RemoteStore};

/// An in-memory store pre-populated with social data.
pub struct SocialFixture {
    /// The backing store.
    pub store: Arc<MemoryRemoteStore>,
}

impl SocialFixture {
    /// Creates an empty fixture.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryRemoteStore::new()),
        }
    }

    /// Seeds a post with a consistent like counter.
    pub fn seed_post(&self, post: &str, author: &str, liked_by: &[&str]) -> PostId {
        self.seed_post_with_like_count(post, author, liked_by, liked_by.len() as u64)
    }

    /// Seeds a post whose like counter may disagree with its membership
    /// map, for invariant-repair tests.
    pub fn seed_post_with_like_count(
        &self,
        post: &str,
        author: &str,
        liked_by: &[&str],
        like_count: u64,
    ) -> PostId {
        let doc = PostDocument {
            author_id: Some(UserId::from(author)),
            caption: format!("{post} caption"),
            like_count,
            liked_by: membership(liked_by),
            comment_count: 0,
            timestamp: 1_700_000_000_000,
        };
        let value = doc.to_value().expect("post document serializes");
        self.store
            .write(&NodePath::new("posts").child(post), value)
            .expect("seed post");
        PostId::from(post)
    }

    /// Seeds a comment under a post and bumps the post's comment counter.
    pub fn seed_comment(&self, post: &str, comment: &str, author: &str, text: &str) -> CommentId {
        let record = Comment::new(
            CommentId::from(comment),
            PostId::from(post),
            UserId::from(author),
            text,
        );
        let value = CommentDocument::from_comment(&record)
            .to_value()
            .expect("comment document serializes");
        let path = NodePath::new("posts").child(post).child("comments").child(comment);
        self.store.write(&path, value).expect("seed comment");

        let post_path = NodePath::new("posts").child(post);
        if let Ok(Some(snapshot)) = self.store.read(&post_path) {
            if let Ok(mut doc) = PostDocument::from_value(&snapshot.value) {
                doc.comment_count += 1;
                let value = doc.to_value().expect("post document serializes");
                self.store.write(&post_path, value).expect("bump comment count");
            }
        }
        CommentId::from(comment)
    }

    /// Seeds a user's follower document and the follower-side mirrors.
    pub fn seed_followers(&self, user: &str, followers: &[&str]) -> UserId {
        let doc = FollowerDocument {
            follower_count: followers.len() as u64,
            followers: membership(followers),
        };
        let value = doc.to_value().expect("follower document serializes");
        self.store
            .write(&NodePath::new("followers").child(user), value)
            .expect("seed followers");

        for follower in followers {
            let mirror = NodePath::new("following").child(follower).child(user);
            self.store
                .write(&mirror, serde_json::Value::Bool(true))
                .expect("seed following mirror");
        }
        UserId::from(user)
    }

    /// Seeds a user profile document.
    pub fn seed_user(&self, user: &str, name: &str) -> UserId {
        let doc = UserDocument {
            user_name: name.to_owned(),
            user_bio: String::new(),
            user_status: "active".to_owned(),
            created_at: 1_700_000_000_000,
        };
        let value = doc.to_value().expect("user document serializes");
        self.store
            .write(&NodePath::new("users").child(user), value)
            .expect("seed user");
        UserId::from(user)
    }
}

impl Default for SocialFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SocialFixture {
    type Target = MemoryRemoteStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

fn membership(users: &[&str]) -> BTreeMap<String, bool> {
    users.iter().map(|user| ((*user).to_owned(), true)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_post_is_readable() {
        let fixture = SocialFixture::new();
        fixture.seed_post("p1", "u1", &["u2", "u3"]);

        let snapshot = fixture
            .store
            .read(&NodePath::new("posts/p1"))
            .unwrap()
            .unwrap();
        let doc = PostDocument::from_value(&snapshot.value).unwrap();
        assert_eq!(doc.like_count, 2);
        assert!(doc.liked_by.contains_key("u2"));
    }

    #[test]
    fn seeded_comment_bumps_counter() {
        let fixture = SocialFixture::new();
        fixture.seed_post("p1", "u1", &[]);
        fixture.seed_comment("p1", "c1", "u2", "hello");

        let snapshot = fixture
            .store
            .read(&NodePath::new("posts/p1"))
            .unwrap()
            .unwrap();
        let doc = PostDocument::from_value(&snapshot.value).unwrap();
        assert_eq!(doc.comment_count, 1);
    }

    #[test]
    fn seeded_followers_include_mirrors() {
        let fixture = SocialFixture::new();
        fixture.seed_followers("u5", &["u1", "u2"]);

        let mirror = fixture
            .store
            .read(&NodePath::new("following/u1/u5"))
            .unwrap()
            .unwrap();
        assert_eq!(mirror.value, serde_json::Value::Bool(true));
    }
}
