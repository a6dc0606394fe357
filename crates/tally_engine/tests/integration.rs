//! Integration tests for the engagement client against the in-memory
//! remote store.

use proptest::prelude::*;
use std::sync::Arc;
use tally_engine::{EngageError, EngagementClient, EventPhase, PushOutcome};
use tally_model::{EntityRef, PostDocument, PostId, UserId};
use tally_store::{NodePath, RemoteChange, RemoteStore, StoreError};
use tally_testkit::{member_set_strategy, shuffled_revisions_strategy, SocialFixture};

fn client(fixture: &SocialFixture) -> EngagementClient<tally_store::MemoryRemoteStore> {
    EngagementClient::new(Arc::clone(&fixture.store))
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn like_confirms_and_keeps_optimistic_count() {
    // Scenario: post with three likes, a fourth user likes it.
    init_logging();
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &["u1", "u2", "u3"]);
    let client = client(&fixture);
    let entity = EntityRef::post(&post);

    client.hydrate_post(&post).unwrap();
    assert_eq!(client.current_count(&entity), Some(3));

    let u4 = UserId::from("u4");
    let in_flight = client.like(&post, &u4).unwrap();

    // Immediate optimistic state.
    assert_eq!(client.current_count(&entity), Some(4));
    assert!(client.is_member(&entity, &u4));
    assert_eq!(client.pending_operations().len(), 1);

    let reconciled = client.resolve(in_flight).unwrap();
    assert_eq!(reconciled.count, 4);
    assert!(!reconciled.refetched);

    // Final state unchanged, pending operation removed.
    assert_eq!(client.current_count(&entity), Some(4));
    assert!(client.pending_operations().is_empty());

    // Server truth reflects the transaction.
    let doc = PostDocument::from_value(
        &fixture.store.document(&NodePath::new("posts/p1")).unwrap(),
    )
    .unwrap();
    assert_eq!(doc.like_count, 4);
    assert!(doc.liked_by.contains_key("u4"));
}

#[test]
fn failed_like_rolls_back_to_pre_mutation_state() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &["u1", "u2", "u3"]);
    let client = client(&fixture);
    let entity = EntityRef::post(&post);

    client.hydrate_post(&post).unwrap();
    let members_before = [UserId::from("u1"), UserId::from("u2"), UserId::from("u3")];

    let u4 = UserId::from("u4");
    let in_flight = client.like(&post, &u4).unwrap();
    assert_eq!(client.current_count(&entity), Some(4));

    fixture.store.deny_permission(NodePath::new("posts"));
    let err = client.resolve(in_flight).unwrap_err();
    assert!(matches!(err, EngageError::RemoteTransaction { .. }));
    assert!(!err.is_retryable());

    // Rolled back to the exact pre-mutation state.
    assert_eq!(client.current_count(&entity), Some(3));
    assert!(!client.is_member(&entity, &u4));
    for member in &members_before {
        assert!(client.is_member(&entity, member));
    }
    assert!(client.pending_operations().is_empty());
}

#[test]
fn duplicate_like_is_rejected_while_in_flight() {
    // Scenario: two rapid likes before the first resolves.
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &[]);
    let client = client(&fixture);
    let u4 = UserId::from("u4");

    client.hydrate_post(&post).unwrap();
    let first = client.like(&post, &u4).unwrap();

    let err = client.like(&post, &u4).unwrap_err();
    assert!(err.is_concurrent());

    client.resolve(first).unwrap();

    // Only one net +1 was ever applied.
    let doc = PostDocument::from_value(
        &fixture.store.document(&NodePath::new("posts/p1")).unwrap(),
    )
    .unwrap();
    assert_eq!(doc.like_count, 1);
}

#[test]
fn transient_failure_is_surfaced_as_retryable() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &[]);
    let client = client(&fixture);

    client.hydrate_post(&post).unwrap();
    let in_flight = client.like(&post, &UserId::from("u1")).unwrap();

    fixture
        .store
        .set_fail_next_transact(StoreError::unavailable_retryable("connection reset"));
    let err = client.resolve(in_flight).unwrap_err();
    assert!(err.is_retryable());

    // A retry is a new, explicit action; the slot is free again.
    let retry = client.like(&post, &UserId::from("u1")).unwrap();
    client.resolve(retry).unwrap();
    assert_eq!(
        client.current_count(&EntityRef::post(&post)),
        Some(1)
    );
}

#[test]
fn follow_maintains_both_denormalized_locations() {
    let fixture = SocialFixture::new();
    let client = client(&fixture);
    let (u1, u5) = (UserId::from("u1"), UserId::from("u5"));

    let in_flight = client.follow(&u1, &u5).unwrap();

    // Optimistic: edge visible on both sides at once.
    assert!(client.is_following(&u1, &u5));
    assert_eq!(client.follower_count(&u5), 1);
    assert_eq!(client.following_count(&u1), 1);

    client.resolve(in_flight).unwrap();

    // Both remote locations were written.
    let followers = fixture.store.document(&NodePath::new("followers/u5")).unwrap();
    assert_eq!(followers["followerCount"], 1);
    assert_eq!(followers["followers"]["u1"], true);
    assert_eq!(
        fixture.store.document(&NodePath::new("following/u1/u5")),
        Some(serde_json::Value::Bool(true))
    );

    // And unfollow removes both again.
    let in_flight = client.unfollow(&u1, &u5).unwrap();
    assert!(!client.is_following(&u1, &u5));
    client.resolve(in_flight).unwrap();

    let followers = fixture.store.document(&NodePath::new("followers/u5")).unwrap();
    assert_eq!(followers["followerCount"], 0);
    assert!(fixture
        .store
        .document(&NodePath::new("following/u1/u5"))
        .is_none());
}

#[test]
fn failed_follow_reverts_edge_and_counter() {
    let fixture = SocialFixture::new();
    fixture.seed_followers("u5", &["u2"]);
    let client = client(&fixture);
    let (u1, u5) = (UserId::from("u1"), UserId::from("u5"));

    client.hydrate_followers(&u5).unwrap();
    assert_eq!(client.follower_count(&u5), 1);

    let in_flight = client.follow(&u1, &u5).unwrap();
    assert_eq!(client.follower_count(&u5), 2);

    fixture.store.deny_permission(NodePath::new("followers"));
    let err = client.resolve(in_flight).unwrap_err();
    assert!(matches!(err, EngageError::RemoteTransaction { .. }));

    assert_eq!(client.follower_count(&u5), 1);
    assert!(!client.is_following(&u1, &u5));
    assert!(client.is_following(&UserId::from("u2"), &u5));
}

#[test]
fn concurrent_push_is_buffered_until_resolution() {
    // Scenario: a push update for the followee arrives while an unfollow
    // is pending; it must not clobber the optimistic state, and the final
    // state converges on server truth.
    let fixture = SocialFixture::new();
    fixture.seed_followers("u5", &["u1"]);
    let client = client(&fixture);
    let (u1, u5, u9) = (UserId::from("u1"), UserId::from("u5"), UserId::from("u9"));
    let entity = EntityRef::user(&u5);

    client.hydrate_followers(&u5).unwrap();
    assert!(client.is_following(&u1, &u5));

    let rx = fixture.store.subscribe(&NodePath::new("followers/u5"));
    let in_flight = client.unfollow(&u1, &u5).unwrap();
    assert_eq!(client.current_count(&entity), Some(0));

    // Another device adds a follower concurrently.
    fixture
        .store
        .transact(&NodePath::new("followers/u5"), &mut |current| {
            let value = current.cloned().unwrap_or_default();
            let mut doc = tally_model::FollowerDocument::from_value(&value).unwrap();
            doc.set_follower(&UserId::from("u9"), true);
            tally_store::TransactionOutcome::Commit(doc.to_value().unwrap())
        })
        .unwrap();

    // Pump the subscription: the change is buffered, not applied.
    for change in rx.try_iter() {
        let outcome = client.apply_remote_change(&change).unwrap();
        assert_eq!(outcome, PushOutcome::Buffered);
    }
    assert_eq!(client.buffered_update_count(&entity), 1);
    assert_eq!(client.current_count(&entity), Some(0));

    // The unfollow transaction ran after the external follow, so its
    // result already contains u9; the buffered older push is dropped.
    client.resolve(in_flight).unwrap();
    assert_eq!(client.buffered_update_count(&entity), 0);
    assert_eq!(client.current_count(&entity), Some(1));
    assert!(client.is_member(&entity, &u9));
    assert!(!client.is_member(&entity, &u1));
    assert!(!client.is_following(&u1, &u5));
    assert_eq!(client.follower_count(&u5), 1);
}

#[test]
fn post_deleted_during_in_flight_like_clears_local_state() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &["u1"]);
    let client = client(&fixture);
    let entity = EntityRef::post(&post);

    client.hydrate_post(&post).unwrap();
    let in_flight = client.like(&post, &UserId::from("u4")).unwrap();

    // The post disappears remotely before the transaction runs.
    fixture.store.delete(&NodePath::new("posts/p1")).unwrap();

    let err = client.resolve(in_flight).unwrap_err();
    assert!(matches!(err, EngageError::NotFound { .. }));

    assert_eq!(client.current_count(&entity), Some(0));
    assert!(!client.is_member(&entity, &UserId::from("u1")));
    assert!(client.pending_operations().is_empty());
}

#[test]
fn comment_lifecycle_maintains_counter() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &[]);
    let client = client(&fixture);
    let u2 = UserId::from("u2");

    client.hydrate_post(&post).unwrap();

    // Post.
    let in_flight = client.post_comment(&post, &u2, "first!").unwrap();
    let comment_id = in_flight.comment().unwrap().id.clone();
    assert_eq!(client.comment_count(&post), Some(1));
    client.resolve(in_flight).unwrap();

    let comments = client.comments(&post).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "first!");
    assert!(comments[0].edited_at.is_none());

    // Edit: text replaced, counter untouched.
    let in_flight = client.edit_comment(&post, &comment_id, &u2, "first, edited").unwrap();
    client.resolve(in_flight).unwrap();
    let comments = client.comments(&post).unwrap();
    assert_eq!(comments[0].text, "first, edited");
    assert!(comments[0].edited_at.is_some());
    assert_eq!(client.comment_count(&post), Some(1));

    // Delete: record removed, counter decremented.
    let in_flight = client.delete_comment(&post, &comment_id, &u2).unwrap();
    assert_eq!(client.comment_count(&post), Some(0));
    client.resolve(in_flight).unwrap();
    assert!(client.comments(&post).unwrap().is_empty());

    let doc = PostDocument::from_value(
        &fixture.store.document(&NodePath::new("posts/p1")).unwrap(),
    )
    .unwrap();
    assert_eq!(doc.comment_count, 0);
}

#[test]
fn failed_comment_count_transaction_rolls_back() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &[]);
    let client = client(&fixture);

    client.hydrate_post(&post).unwrap();
    let in_flight = client
        .post_comment(&post, &UserId::from("u2"), "doomed")
        .unwrap();
    assert_eq!(client.comment_count(&post), Some(1));

    fixture
        .store
        .set_fail_next_transact(StoreError::unavailable_retryable("connection reset"));
    let err = client.resolve(in_flight).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(client.comment_count(&post), Some(0));
}

#[test]
fn editing_a_missing_comment_fails_without_clearing_post_state() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &["u1"]);
    let client = client(&fixture);
    let entity = EntityRef::post(&post);

    client.hydrate_post(&post).unwrap();
    let in_flight = client
        .edit_comment(
            &post,
            &tally_model::CommentId::from("missing"),
            &UserId::from("u2"),
            "never lands",
        )
        .unwrap();

    let err = client.resolve(in_flight).unwrap_err();
    assert!(matches!(err, EngageError::CommentNotFound { .. }));

    // The post's counters are untouched.
    assert_eq!(client.current_count(&entity), Some(1));
    assert_eq!(client.comment_count(&post), Some(0));
}

#[test]
fn stale_pushes_never_regress_counts() {
    let fixture = SocialFixture::new();
    let client = client(&fixture);
    let post = PostId::from("p1");
    let path = NodePath::new("posts/p1");

    let mut newer = PostDocument::default();
    newer.set_liked(&UserId::from("u1"), true);
    newer.set_liked(&UserId::from("u2"), true);
    let mut older = PostDocument::default();
    older.set_liked(&UserId::from("u1"), true);

    let outcome = client
        .apply_remote_change(&RemoteChange {
            path: path.clone(),
            value: Some(newer.to_value().unwrap()),
            revision: 9,
        })
        .unwrap();
    assert_eq!(outcome, PushOutcome::Applied);

    let outcome = client
        .apply_remote_change(&RemoteChange {
            path,
            value: Some(older.to_value().unwrap()),
            revision: 4,
        })
        .unwrap();
    assert_eq!(outcome, PushOutcome::Stale);

    assert_eq!(client.current_count(&EntityRef::post(&post)), Some(2));
}

#[test]
fn reapplying_confirmed_state_is_idempotent() {
    let fixture = SocialFixture::new();
    let client = client(&fixture);
    let post = PostId::from("p1");
    let entity = EntityRef::post(&post);

    let mut doc = PostDocument::default();
    doc.set_liked(&UserId::from("u1"), true);
    let change = RemoteChange {
        path: NodePath::new("posts/p1"),
        value: Some(doc.to_value().unwrap()),
        revision: 3,
    };

    client.apply_remote_change(&change).unwrap();
    let before = client.view(&entity).unwrap();

    let outcome = client.apply_remote_change(&change).unwrap();
    assert_eq!(outcome, PushOutcome::Stale);
    assert_eq!(client.view(&entity).unwrap(), before);
}

#[test]
fn remote_changes_from_another_client_flow_through_subscription() {
    init_logging();
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &[]);
    let watcher = client(&fixture);
    let other = client(&fixture);

    watcher.hydrate_post(&post).unwrap();
    let rx = fixture.store.subscribe(&NodePath::new("posts/p1"));

    // Another device likes the post.
    let in_flight = other.like(&post, &UserId::from("u9")).unwrap();
    other.resolve(in_flight).unwrap();

    for change in rx.try_iter() {
        watcher.apply_remote_change(&change).unwrap();
    }

    let entity = EntityRef::post(&post);
    assert_eq!(watcher.current_count(&entity), Some(1));
    assert!(watcher.is_member(&entity, &UserId::from("u9")));
}

#[test]
fn inconsistent_server_counter_is_discarded_not_trusted() {
    let fixture = SocialFixture::new();
    // likeCount claims 5 but only one user is in the membership map.
    let post = fixture.seed_post_with_like_count("p1", "author", &["u1"], 5);
    let client = client(&fixture);

    client.hydrate_post(&post).unwrap();

    // The refetched document is still inconsistent, so the cache stays
    // discarded rather than trusted.
    assert_eq!(client.current_count(&EntityRef::post(&post)), None);
}

#[test]
fn hydrate_following_populates_cold_start_view() {
    let fixture = SocialFixture::new();
    fixture.seed_followers("u5", &["u1"]);
    fixture.seed_followers("u6", &["u1"]);
    let client = client(&fixture);
    let u1 = UserId::from("u1");

    client.hydrate_following(&u1).unwrap();
    assert_eq!(client.following_count(&u1), 2);
    assert!(client.is_following(&u1, &UserId::from("u5")));
    assert!(client.is_following(&u1, &UserId::from("u6")));
}

#[test]
fn event_feed_reports_mutation_lifecycle() {
    let fixture = SocialFixture::new();
    let post = fixture.seed_post("p1", "author", &[]);
    let client = client(&fixture);
    let events = client.events();

    client.hydrate_post(&post).unwrap();
    let in_flight = client.like(&post, &UserId::from("u1")).unwrap();
    client.resolve(in_flight).unwrap();

    let phases: Vec<EventPhase> = events.try_iter().map(|event| event.phase).collect();
    assert_eq!(
        phases,
        vec![
            EventPhase::RemoteUpdate, // hydration
            EventPhase::Optimistic,
            EventPhase::Confirmed,
        ]
    );

    // A failing mutation ends in a rollback event carrying the error.
    let in_flight = client.unlike(&post, &UserId::from("u1")).unwrap();
    fixture.store.deny_permission(NodePath::new("posts"));
    let _ = client.resolve(in_flight).unwrap_err();

    let trailing: Vec<_> = events.try_iter().collect();
    assert_eq!(trailing.len(), 2);
    assert_eq!(trailing[0].phase, EventPhase::Optimistic);
    assert_eq!(trailing[1].phase, EventPhase::RolledBack);
    assert!(trailing[1].error.is_some());
}

proptest! {
    // Convergence: whatever order updates arrive in, the final state is
    // the highest-revision server state.
    #[test]
    fn pushes_converge_on_highest_revision(
        sets in prop::collection::vec(member_set_strategy(6), 8),
        order in shuffled_revisions_strategy(8),
    ) {
        let fixture = SocialFixture::new();
        let client = client(&fixture);
        let entity = EntityRef::post(&PostId::from("p1"));

        for revision in order {
            let members = &sets[revision as usize - 1];
            let mut doc = PostDocument::default();
            for member in members {
                doc.set_liked(member, true);
            }
            client
                .apply_remote_change(&RemoteChange {
                    path: NodePath::new("posts/p1"),
                    value: Some(doc.to_value().unwrap()),
                    revision,
                })
                .unwrap();
        }

        let expected = &sets[7];
        prop_assert_eq!(client.current_count(&entity), Some(expected.len() as u64));
        for member in expected {
            prop_assert!(client.is_member(&entity, member));
        }
    }
}
