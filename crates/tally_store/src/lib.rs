//! # Tally Store
//!
//! Remote store abstraction for the Tally engagement reconciler.
//!
//! This crate provides:
//! - The [`RemoteStore`] trait: per-path atomic transactions, one-shot
//!   reads, unconditional writes, change subscriptions, and
//!   collision-resistant ID generation
//! - [`NodePath`] for addressing documents
//! - [`MemoryRemoteStore`], an in-memory backend with revision tracking
//!   and fault injection for tests
//!
//! The store exclusively owns durable truth; clients keep only an
//! ephemeral shadow that is discarded once reconciliation completes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod path;
mod remote;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRemoteStore;
pub use path::NodePath;
pub use remote::{Committed, RemoteChange, RemoteStore, Snapshot, TransactionOutcome};
