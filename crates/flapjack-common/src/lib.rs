//! Shared vocabulary for the Flapjack event pipeline.
//!
//! The condition vocabulary, the inbound wire event, and the two internal
//! work items ([`types::Notification`] and [`types::AlertRecord`]) live here
//! so that the processor, resolver, and dispatcher crates agree on them
//! without depending on each other.

pub mod id;
pub mod stats;
pub mod types;
