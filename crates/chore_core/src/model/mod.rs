//! Domain model for team members and chores.
//!
//! # Responsibility
//! - Define the canonical records owned by the state store.
//! - Reject malformed input at construction and deserialization time.
//!
//! # Invariants
//! - Every member and chore is identified by a stable, non-nil UUID.
//! - A chore's occurrence mode is a tagged variant (`Schedule`).

pub mod chore;
pub mod member;
pub mod state;
pub mod weekday;

use uuid::Uuid;

/// Generates a new stable identifier.
///
/// UUIDv7 combines a millisecond timestamp with random bits, so ids are
/// unique within a process and roughly ordered by creation time.
pub fn generate_id() -> Uuid {
    Uuid::now_v7()
}
