//! Repository layer for persisted application state.
//!
//! # Responsibility
//! - Define the snapshot persistence contract used by the state store.
//! - Keep SQLite and JSON details out of the store and resolver.
//!
//! # Invariants
//! - Writes validate referential consistency before touching storage.
//! - Reads reject invalid persisted state instead of masking it.

pub mod snapshot_repo;
