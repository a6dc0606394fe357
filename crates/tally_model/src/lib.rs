//! # Tally Model
//!
//! Data model for the Tally engagement reconciler.
//!
//! This crate provides:
//! - Entity and user identifiers
//! - Mutation kinds and their concurrency kind-classes
//! - `CounterState` for membership-backed engagement counters
//! - `Comment` and `FollowEdge` records
//! - Remote document schemas (JSON) shared with the backend
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod comment;
mod counter;
mod document;
mod follow;
mod id;
mod mutation;

pub use comment::Comment;
pub use counter::CounterState;
pub use document::{CommentDocument, FollowerDocument, PostDocument, UserDocument};
pub use follow::FollowEdge;
pub use id::{CommentId, EntityKind, EntityRef, PostId, UserId};
pub use mutation::{KindClass, MutationKind};
