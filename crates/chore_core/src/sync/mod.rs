//! Change notification between store instances.
//!
//! # Responsibility
//! - Broadcast "state updated" notices after a snapshot is persisted.
//! - Let consumers decide when to rehydrate from persisted state.
//!
//! # Invariants
//! - Notices carry the persisted revision; they never carry state.
//! - Freshness is the consumer's concern; the resolver has no notion of it.

pub mod hub;
