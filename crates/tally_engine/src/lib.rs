//! # Tally Engine
//!
//! Optimistic engagement reconciler for social clients.
//!
//! This crate provides:
//! - Optimistic mutation of engagement counters (likes, comment counts)
//!   and relationship sets (followers/following)
//! - At-most-one in-flight mutation per (entity, actor, kind-class)
//! - Reconciliation of local shadows against authoritative server state
//! - A derived follower/following graph view
//! - An event feed for the presentation layer
//!
//! ## Architecture
//!
//! A user action flows through the components in order:
//! 1. The optimistic mutator flips local state immediately
//! 2. The pending-operation tracker admits or rejects the action
//! 3. The remote store runs the atomic transaction
//! 4. The reconciliation engine adopts the authoritative result, or
//!    reverts on failure
//! 5. The relationship graph view is recomputed incrementally
//!
//! ## Key Invariants
//!
//! - The remote store owns durable truth; local shadows are ephemeral
//! - At most one mutation per (entity, actor, kind-class) is in flight
//! - Local intent wins until its transaction resolves, then server truth
//!   wins unconditionally
//! - Per entity, updates apply in increasing revision order; the rest
//!   are dropped, so counts never regress under network reordering
//! - A rejected mutation never retries automatically

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod feed;
mod graph;
mod mutator;
mod reconcile;
mod shadow;
mod tracker;

pub use client::{EngagementClient, MutationInFlight, Reconciled};
pub use config::EngageConfig;
pub use error::{EngageError, EngageResult};
pub use feed::{EngagementEvent, EventFeed, EventPhase};
pub use graph::RelationshipGraphView;
pub use mutator::{LocalDelta, OptimisticMutator};
pub use reconcile::{PushOutcome, ReconcileReport, ReconciliationEngine, RemoteEntityState};
pub use shadow::{EngagementState, EntityView};
pub use tracker::{PendingOperation, PendingOperationTracker, PendingOutcome, PendingToken};
