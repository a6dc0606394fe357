//! Client facade wiring the engagement components together.

use crate::config::EngageConfig;
use crate::error::{EngageError, EngageResult};
use crate::feed::{EngagementEvent, EventFeed, EventPhase};
use crate::graph::RelationshipGraphView;
use crate::mutator::{LocalDelta, OptimisticMutator};
use crate::reconcile::{PushOutcome, ReconciliationEngine, RemoteEntityState};
use crate::shadow::{EngagementState, EntityView};
use crate::tracker::{PendingOperation, PendingOperationTracker, PendingOutcome, PendingToken};
use serde_json::Value;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tally_model::{
    Comment, CommentDocument, CommentId, EntityKind, EntityRef, FollowEdge, FollowerDocument,
    MutationKind, PostDocument, PostId, UserId,
};
use tally_store::{RemoteChange, RemoteStore, StoreError, TransactionOutcome};
use tracing::{debug, warn};

/// The remote side of an in-flight mutation.
#[derive(Debug, Clone)]
pub(crate) enum RemoteCommand {
    SetLike {
        post: PostId,
        actor: UserId,
        liked: bool,
    },
    SetFollow {
        edge: FollowEdge,
        following: bool,
    },
    PublishComment {
        comment: Comment,
    },
    AmendComment {
        post: PostId,
        comment_id: CommentId,
        text: String,
    },
    RetractComment {
        post: PostId,
        comment_id: CommentId,
    },
}

/// An accepted mutation awaiting its remote resolution.
///
/// The optimistic delta has already been applied; pass the handle to
/// [`EngagementClient::resolve`] to drive the remote transaction and
/// converge on server truth.
#[derive(Debug)]
pub struct MutationInFlight {
    delta: LocalDelta,
    token: PendingToken,
    command: RemoteCommand,
}

impl MutationInFlight {
    /// The optimistic delta applied for this mutation.
    pub fn delta(&self) -> &LocalDelta {
        &self.delta
    }

    /// The comment record being published, for comment-post mutations.
    pub fn comment(&self) -> Option<&Comment> {
        match &self.command {
            RemoteCommand::PublishComment { comment } => Some(comment),
            _ => None,
        }
    }
}

/// The result of a confirmed mutation.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The mutated entity.
    pub entity: EntityRef,
    /// The entity's engagement count after adopting server truth.
    pub count: u64,
    /// The server revision of the confirming transaction.
    pub revision: u64,
    /// Whether the local cache was discarded and refetched because the
    /// adopted counter disagreed with its membership set.
    pub refetched: bool,
}

/// Client for optimistic engagement mutations against a remote store.
///
/// All dependencies are explicit: the store handle is injected at
/// construction and every operation names its actor. Mutations apply
/// their local effect synchronously and return an in-flight handle;
/// [`resolve`](Self::resolve) is the only call that blocks on remote I/O,
/// so run it from a worker thread when the caller must not block.
pub struct EngagementClient<S: RemoteStore> {
    store: Arc<S>,
    config: EngageConfig,
    state: Arc<EngagementState>,
    graph: Arc<RelationshipGraphView>,
    feed: Arc<EventFeed>,
    tracker: PendingOperationTracker,
    mutator: OptimisticMutator,
    reconciler: ReconciliationEngine,
}

impl<S: RemoteStore> EngagementClient<S> {
    /// Creates a client with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngageConfig::default())
    }

    /// Creates a client with the given configuration.
    pub fn with_config(store: Arc<S>, config: EngageConfig) -> Self {
        let state = Arc::new(EngagementState::new());
        let graph = Arc::new(RelationshipGraphView::new());
        let feed = Arc::new(EventFeed::new(config.event_history));
        let mutator = OptimisticMutator::new(Arc::clone(&state));
        let reconciler = ReconciliationEngine::new(
            Arc::clone(&state),
            Arc::clone(&graph),
            config.verify_counts,
            config.max_buffered_updates,
        );
        Self {
            store,
            config,
            state,
            graph,
            feed,
            tracker: PendingOperationTracker::new(),
            mutator,
            reconciler,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &EngageConfig {
        &self.config
    }

    /// Subscribes to engagement events.
    pub fn events(&self) -> Receiver<EngagementEvent> {
        self.feed.subscribe()
    }

    /// Returns the most recent events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<EngagementEvent> {
        self.feed.recent(limit)
    }

    // ---- mutations -------------------------------------------------------

    /// Likes a post on behalf of the actor.
    pub fn like(&self, post: &PostId, actor: &UserId) -> EngageResult<MutationInFlight> {
        self.reaction(post, actor, true)
    }

    /// Removes the actor's like from a post.
    pub fn unlike(&self, post: &PostId, actor: &UserId) -> EngageResult<MutationInFlight> {
        self.reaction(post, actor, false)
    }

    /// Adds a follow edge from `follower` to `followee`.
    pub fn follow(&self, follower: &UserId, followee: &UserId) -> EngageResult<MutationInFlight> {
        self.relationship(follower, followee, true)
    }

    /// Removes the follow edge from `follower` to `followee`.
    pub fn unfollow(&self, follower: &UserId, followee: &UserId) -> EngageResult<MutationInFlight> {
        self.relationship(follower, followee, false)
    }

    /// Posts a comment, bumping the post's comment counter.
    pub fn post_comment(
        &self,
        post: &PostId,
        author: &UserId,
        text: impl Into<String>,
    ) -> EngageResult<MutationInFlight> {
        let entity = EntityRef::post(post);
        let token = self.acquire(&entity, author, MutationKind::Comment)?;
        let comment = Comment::new(
            CommentId::new(self.store.generate_id()),
            post.clone(),
            author.clone(),
            text,
        );
        let delta = self.mutator.apply_commenting(post, author, 1);
        self.emit_local(&delta, EventPhase::Optimistic, None);
        Ok(MutationInFlight {
            delta,
            token,
            command: RemoteCommand::PublishComment { comment },
        })
    }

    /// Replaces a comment's text, leaving the counter untouched.
    pub fn edit_comment(
        &self,
        post: &PostId,
        comment_id: &CommentId,
        author: &UserId,
        text: impl Into<String>,
    ) -> EngageResult<MutationInFlight> {
        let entity = EntityRef::post(post);
        let token = self.acquire(&entity, author, MutationKind::Comment)?;
        let delta = self.mutator.apply_commenting(post, author, 0);
        self.emit_local(&delta, EventPhase::Optimistic, None);
        Ok(MutationInFlight {
            delta,
            token,
            command: RemoteCommand::AmendComment {
                post: post.clone(),
                comment_id: comment_id.clone(),
                text: text.into(),
            },
        })
    }

    /// Deletes a comment, decrementing the post's comment counter.
    pub fn delete_comment(
        &self,
        post: &PostId,
        comment_id: &CommentId,
        author: &UserId,
    ) -> EngageResult<MutationInFlight> {
        let entity = EntityRef::post(post);
        let token = self.acquire(&entity, author, MutationKind::Comment)?;
        let delta = self.mutator.apply_commenting(post, author, -1);
        self.emit_local(&delta, EventPhase::Optimistic, None);
        Ok(MutationInFlight {
            delta,
            token,
            command: RemoteCommand::RetractComment {
                post: post.clone(),
                comment_id: comment_id.clone(),
            },
        })
    }

    /// Drives an in-flight mutation to completion against the remote
    /// store and reconciles the outcome.
    ///
    /// On success, server truth is adopted and buffered push updates for
    /// the entity are applied. On failure, the optimistic delta is
    /// reverted and the error surfaced; the engine never retries on its
    /// own.
    pub fn resolve(&self, in_flight: MutationInFlight) -> EngageResult<Reconciled> {
        let MutationInFlight {
            delta,
            token,
            command,
        } = in_flight;

        match self.execute(&command) {
            Ok(update) => {
                let report = self.reconciler.confirm(&delta, &update);
                self.tracker.release(token, PendingOutcome::Confirmed);
                self.emit_local(&delta, EventPhase::Confirmed, None);
                if report.needs_refetch {
                    self.refetch(&delta.entity);
                }
                self.drain_if_idle(&delta.entity);
                Ok(Reconciled {
                    entity: delta.entity.clone(),
                    count: self.state.count(&delta.entity).unwrap_or(0),
                    revision: update.revision,
                    refetched: report.needs_refetch,
                })
            }
            Err(err) => {
                match &err {
                    EngageError::NotFound { entity } if *entity == delta.entity => {
                        self.reconciler.entity_missing(&delta.entity);
                    }
                    _ => self.reconciler.reject(&delta),
                }
                self.tracker.release(token, PendingOutcome::Rejected);
                self.emit_local(&delta, EventPhase::RolledBack, Some(err.to_string()));
                self.drain_if_idle(&delta.entity);
                Err(err)
            }
        }
    }

    // ---- remote-change intake -------------------------------------------

    /// Applies a push update received from a store subscription.
    ///
    /// Updates for entities with in-flight mutations are buffered and
    /// applied after resolution; stale updates are dropped.
    pub fn apply_remote_change(&self, change: &RemoteChange) -> EngageResult<PushOutcome> {
        let segments: Vec<&str> = change.path.as_str().split('/').collect();
        match segments.as_slice() {
            [root, post] if *root == self.config.posts_root => {
                let post = PostId::from(*post);
                let update = match &change.value {
                    Some(value) => {
                        let doc = PostDocument::from_value(value)
                            .map_err(|err| EngageError::malformed(change.path.as_str(), err))?;
                        RemoteEntityState::from_post_document(&post, &doc, change.revision)
                    }
                    None => RemoteEntityState::removal(EntityRef::post(&post), change.revision),
                };
                Ok(self.route_update(update))
            }
            [root, user] if *root == self.config.followers_root => {
                let user = UserId::from(*user);
                let update = match &change.value {
                    Some(value) => {
                        let doc = FollowerDocument::from_value(value)
                            .map_err(|err| EngageError::malformed(change.path.as_str(), err))?;
                        RemoteEntityState::from_follower_document(&user, &doc, change.revision)
                    }
                    None => RemoteEntityState::removal(EntityRef::user(&user), change.revision),
                };
                Ok(self.route_update(update))
            }
            [root, follower, followee] if *root == self.config.following_root => {
                // Mirror entries carry no counter; they only refresh the
                // follower-side view.
                let present = matches!(change.value, Some(Value::Bool(true)));
                let edge = FollowEdge::new(UserId::from(*follower), UserId::from(*followee));
                self.graph.set_edge(&edge, present);
                Ok(PushOutcome::Applied)
            }
            _ => {
                debug!(path = %change.path, "remote change ignored");
                Ok(PushOutcome::Ignored)
            }
        }
    }

    // ---- hydration -------------------------------------------------------

    /// Fetches a post document once and adopts its counters (cold start
    /// or refetch).
    pub fn hydrate_post(&self, post: &PostId) -> EngageResult<PushOutcome> {
        let path = self.config.post_path(post);
        let entity = EntityRef::post(post);
        match self.store.read(&path)? {
            None => {
                self.reconciler.entity_missing(&entity);
                Err(EngageError::not_found(entity))
            }
            Some(snapshot) => {
                let doc = PostDocument::from_value(&snapshot.value)
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                Ok(self.route_update(RemoteEntityState::from_post_document(
                    post,
                    &doc,
                    snapshot.revision,
                )))
            }
        }
    }

    /// Fetches a user's follower document once and adopts it.
    ///
    /// A missing document means the user has no followers yet.
    pub fn hydrate_followers(&self, user: &UserId) -> EngageResult<PushOutcome> {
        let path = self.config.followers_path(user);
        let (doc, revision) = match self.store.read(&path)? {
            Some(snapshot) => {
                let doc = FollowerDocument::from_value(&snapshot.value)
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                (doc, snapshot.revision)
            }
            None => (FollowerDocument::default(), 0),
        };
        Ok(self.route_update(RemoteEntityState::from_follower_document(
            user, &doc, revision,
        )))
    }

    /// Populates the set of users someone follows from the mirror node
    /// (cold-start full scan).
    pub fn hydrate_following(&self, user: &UserId) -> EngageResult<()> {
        let children = self.store.list(&self.config.following_path(user))?;
        let members = children
            .into_iter()
            .filter(|(_, snapshot)| matches!(snapshot.value, Value::Bool(true)))
            .map(|(key, _)| UserId::new(key))
            .collect();
        self.graph.replace_following(user, &members);
        Ok(())
    }

    /// Fetches a post's comments, oldest first.
    pub fn comments(&self, post: &PostId) -> EngageResult<Vec<Comment>> {
        let root = self.config.comments_path(post);
        let children = self.store.list(&root)?;
        let mut comments = Vec::with_capacity(children.len());
        for (key, snapshot) in children {
            let doc = CommentDocument::from_value(&snapshot.value)
                .map_err(|err| EngageError::malformed(root.child(&key).as_str(), err))?;
            comments.push(doc.into_comment(CommentId::new(key), post.clone()));
        }
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    // ---- queries ---------------------------------------------------------

    /// Returns the entity's engagement count, if known locally.
    pub fn current_count(&self, entity: &EntityRef) -> Option<u64> {
        self.state.count(entity)
    }

    /// Returns true if the user contributed to the entity's counter.
    pub fn is_member(&self, entity: &EntityRef, user: &UserId) -> bool {
        self.state.is_member(entity, user)
    }

    /// Returns the post's comment count, if known locally.
    pub fn comment_count(&self, post: &PostId) -> Option<u64> {
        self.state.comment_count(&EntityRef::post(post))
    }

    /// Returns a read-only view of the entity's reconciled state.
    pub fn view(&self, entity: &EntityRef) -> Option<EntityView> {
        self.state.view(entity)
    }

    /// Returns the user's follower count.
    pub fn follower_count(&self, user: &UserId) -> u64 {
        self.graph.follower_count(user)
    }

    /// Returns how many users this user follows.
    pub fn following_count(&self, user: &UserId) -> u64 {
        self.graph.following_count(user)
    }

    /// Returns true if `follower` follows `followee`.
    pub fn is_following(&self, follower: &UserId, followee: &UserId) -> bool {
        self.graph.is_following(follower, followee)
    }

    /// Returns a snapshot of all in-flight operations.
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        self.tracker.operations()
    }

    /// Returns true if any mutation is in flight for the entity.
    pub fn has_pending(&self, entity: &EntityRef) -> bool {
        self.tracker.has_pending(entity)
    }

    /// Returns the number of push updates buffered for the entity.
    pub fn buffered_update_count(&self, entity: &EntityRef) -> usize {
        self.reconciler.buffered_count(entity)
    }

    // ---- internals -------------------------------------------------------

    fn reaction(
        &self,
        post: &PostId,
        actor: &UserId,
        liked: bool,
    ) -> EngageResult<MutationInFlight> {
        let entity = EntityRef::post(post);
        let kind = if liked {
            MutationKind::Like
        } else {
            MutationKind::Unlike
        };
        let token = self.acquire(&entity, actor, kind)?;
        let delta = self.mutator.apply_reaction(post, actor, liked);
        self.emit_local(&delta, EventPhase::Optimistic, None);
        Ok(MutationInFlight {
            delta,
            token,
            command: RemoteCommand::SetLike {
                post: post.clone(),
                actor: actor.clone(),
                liked,
            },
        })
    }

    fn relationship(
        &self,
        follower: &UserId,
        followee: &UserId,
        following: bool,
    ) -> EngageResult<MutationInFlight> {
        let edge = FollowEdge::new(follower.clone(), followee.clone());
        let entity = EntityRef::user(followee);
        let kind = if following {
            MutationKind::Follow
        } else {
            MutationKind::Unfollow
        };
        let token = self.acquire(&entity, follower, kind)?;
        let delta = self.mutator.apply_relationship(&edge, following);
        self.graph.set_edge(&edge, following);
        self.emit_local(&delta, EventPhase::Optimistic, None);
        Ok(MutationInFlight {
            delta,
            token,
            command: RemoteCommand::SetFollow { edge, following },
        })
    }

    fn acquire(
        &self,
        entity: &EntityRef,
        actor: &UserId,
        kind: MutationKind,
    ) -> EngageResult<PendingToken> {
        self.tracker.try_acquire(
            entity.clone(),
            actor.clone(),
            kind,
            self.state.version(entity),
        )
    }

    fn execute(&self, command: &RemoteCommand) -> EngageResult<RemoteEntityState> {
        match command {
            RemoteCommand::SetLike { post, actor, liked } => {
                let (doc, revision) = self.transact_post(post, |doc| {
                    doc.set_liked(actor, *liked);
                })?;
                Ok(RemoteEntityState::from_post_document(post, &doc, revision))
            }
            RemoteCommand::SetFollow { edge, following } => {
                let (doc, revision) = self.transact_followers(&edge.followee, |doc| {
                    doc.set_follower(&edge.follower, *following);
                })?;
                // The follower-side mirror is kept by plain writes, like
                // the backend's multi-location updates.
                let entry = self
                    .config
                    .following_entry_path(&edge.follower, &edge.followee);
                if *following {
                    self.store
                        .write(&entry, Value::Bool(true))
                        .map_err(EngageError::remote)?;
                } else {
                    self.store.delete(&entry).map_err(EngageError::remote)?;
                }
                Ok(RemoteEntityState::from_follower_document(
                    &edge.followee,
                    &doc,
                    revision,
                ))
            }
            RemoteCommand::PublishComment { comment } => {
                let path = self.config.comment_path(&comment.post_id, &comment.id);
                let value = CommentDocument::from_comment(comment)
                    .to_value()
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                self.store.write(&path, value).map_err(EngageError::remote)?;
                let (doc, revision) = self.transact_post(&comment.post_id, |doc| {
                    doc.comment_count += 1;
                })?;
                Ok(RemoteEntityState::from_post_document(
                    &comment.post_id,
                    &doc,
                    revision,
                ))
            }
            RemoteCommand::AmendComment {
                post,
                comment_id,
                text,
            } => {
                let path = self.config.comment_path(post, comment_id);
                let snapshot =
                    self.store.read(&path).map_err(EngageError::remote)?.ok_or_else(|| {
                        EngageError::CommentNotFound {
                            post: post.clone(),
                            comment: comment_id.clone(),
                        }
                    })?;
                let doc = CommentDocument::from_value(&snapshot.value)
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                let updated = doc
                    .into_comment(comment_id.clone(), post.clone())
                    .with_text(text.clone());
                let value = CommentDocument::from_comment(&updated)
                    .to_value()
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                let revision = self.store.write(&path, value).map_err(EngageError::remote)?;
                Ok(RemoteEntityState::revision_only(
                    EntityRef::post(post),
                    revision,
                ))
            }
            RemoteCommand::RetractComment { post, comment_id } => {
                let path = self.config.comment_path(post, comment_id);
                self.store.delete(&path).map_err(EngageError::remote)?;
                let (doc, revision) = self.transact_post(post, |doc| {
                    doc.comment_count = doc.comment_count.saturating_sub(1);
                })?;
                Ok(RemoteEntityState::from_post_document(post, &doc, revision))
            }
        }
    }

    fn transact_post<F>(&self, post: &PostId, mutate: F) -> EngageResult<(PostDocument, u64)>
    where
        F: Fn(&mut PostDocument),
    {
        let path = self.config.post_path(post);
        let mut schema_err: Option<serde_json::Error> = None;
        let result = self.store.transact(&path, &mut |current| match current {
            None => TransactionOutcome::AbortMissing,
            Some(value) => match PostDocument::from_value(value) {
                Ok(mut doc) => {
                    mutate(&mut doc);
                    match doc.to_value() {
                        Ok(value) => TransactionOutcome::Commit(value),
                        Err(err) => {
                            schema_err = Some(err);
                            TransactionOutcome::Abort
                        }
                    }
                }
                Err(err) => {
                    schema_err = Some(err);
                    TransactionOutcome::Abort
                }
            },
        });

        match result {
            Ok(committed) => {
                let doc = PostDocument::from_value(&committed.value)
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                Ok((doc, committed.revision))
            }
            Err(err) => {
                if let Some(schema) = schema_err {
                    return Err(EngageError::malformed(path.as_str(), schema));
                }
                match err {
                    StoreError::NotFound { .. } => {
                        Err(EngageError::not_found(EntityRef::post(post)))
                    }
                    other => Err(EngageError::remote(other)),
                }
            }
        }
    }

    fn transact_followers<F>(
        &self,
        user: &UserId,
        mutate: F,
    ) -> EngageResult<(FollowerDocument, u64)>
    where
        F: Fn(&mut FollowerDocument),
    {
        let path = self.config.followers_path(user);
        let mut schema_err: Option<serde_json::Error> = None;
        let result = self.store.transact(&path, &mut |current| {
            // Following a user with no followers yet creates the document.
            let parsed = match current {
                Some(value) => FollowerDocument::from_value(value),
                None => Ok(FollowerDocument::default()),
            };
            match parsed {
                Ok(mut doc) => {
                    mutate(&mut doc);
                    match doc.to_value() {
                        Ok(value) => TransactionOutcome::Commit(value),
                        Err(err) => {
                            schema_err = Some(err);
                            TransactionOutcome::Abort
                        }
                    }
                }
                Err(err) => {
                    schema_err = Some(err);
                    TransactionOutcome::Abort
                }
            }
        });

        match result {
            Ok(committed) => {
                let doc = FollowerDocument::from_value(&committed.value)
                    .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                Ok((doc, committed.revision))
            }
            Err(err) => {
                if let Some(schema) = schema_err {
                    return Err(EngageError::malformed(path.as_str(), schema));
                }
                Err(EngageError::remote(err))
            }
        }
    }

    fn route_update(&self, update: RemoteEntityState) -> PushOutcome {
        if self.tracker.has_pending(&update.entity) {
            debug!(entity = %update.entity, "push update buffered behind in-flight mutation");
            self.reconciler.buffer(update);
            return PushOutcome::Buffered;
        }
        let report = self.reconciler.adopt(&update);
        if !report.applied {
            return PushOutcome::Stale;
        }
        self.emit_remote(&update.entity);
        if report.needs_refetch {
            self.refetch(&update.entity);
        }
        PushOutcome::Applied
    }

    fn drain_if_idle(&self, entity: &EntityRef) {
        if self.tracker.has_pending(entity) {
            return;
        }
        let (applied, needs_refetch) = self.reconciler.drain(entity);
        for update in &applied {
            self.emit_remote(&update.entity);
        }
        if needs_refetch {
            self.refetch(entity);
        }
    }

    /// Best-effort refetch after the local cache was discarded.
    ///
    /// Adopts the fetched document directly, exactly once: if the store
    /// still serves an inconsistent counter, the cache stays discarded
    /// instead of looping.
    fn refetch(&self, entity: &EntityRef) {
        if self.tracker.has_pending(entity) {
            debug!(entity = %entity, "refetch skipped; mutation in flight");
            return;
        }
        if let Err(err) = self.refetch_once(entity) {
            warn!(entity = %entity, %err, "refetch after cache discard failed");
        }
    }

    fn refetch_once(&self, entity: &EntityRef) -> EngageResult<()> {
        let update = match entity.kind {
            EntityKind::Post => {
                let post = PostId::new(entity.id.clone());
                let path = self.config.post_path(&post);
                match self.store.read(&path)? {
                    None => {
                        self.reconciler.entity_missing(entity);
                        return Ok(());
                    }
                    Some(snapshot) => {
                        let doc = PostDocument::from_value(&snapshot.value)
                            .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                        RemoteEntityState::from_post_document(&post, &doc, snapshot.revision)
                    }
                }
            }
            EntityKind::User => {
                let user = UserId::new(entity.id.clone());
                let path = self.config.followers_path(&user);
                let (doc, revision) = match self.store.read(&path)? {
                    Some(snapshot) => {
                        let doc = FollowerDocument::from_value(&snapshot.value)
                            .map_err(|err| EngageError::malformed(path.as_str(), err))?;
                        (doc, snapshot.revision)
                    }
                    None => (FollowerDocument::default(), 0),
                };
                RemoteEntityState::from_follower_document(&user, &doc, revision)
            }
        };

        let report = self.reconciler.adopt(&update);
        if report.needs_refetch {
            warn!(entity = %entity, "refetched document still inconsistent; cache stays discarded");
        } else if report.applied {
            self.emit_remote(entity);
        }
        Ok(())
    }

    fn emit_local(&self, delta: &LocalDelta, phase: EventPhase, error: Option<String>) {
        self.feed.emit(EngagementEvent {
            entity: delta.entity.clone(),
            actor: Some(delta.actor.clone()),
            kind: Some(delta.kind),
            phase,
            count: self.state.count(&delta.entity).unwrap_or(0),
            version: self.state.version(&delta.entity),
            error,
        });
    }

    fn emit_remote(&self, entity: &EntityRef) {
        self.feed.emit(EngagementEvent {
            entity: entity.clone(),
            actor: None,
            kind: None,
            phase: EventPhase::RemoteUpdate,
            count: self.state.count(entity).unwrap_or(0),
            version: self.state.version(entity),
            error: None,
        });
    }
}
