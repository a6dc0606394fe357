//! # Tally Testkit
//!
//! Test utilities for Tally: seeded store fixtures and property-based
//! generators shared by the engine's tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fixtures;
mod generators;

pub use fixtures::SocialFixture;
pub use generators::{
    member_set_strategy, post_id_strategy, shuffled_revisions_strategy, user_id_strategy,
};
