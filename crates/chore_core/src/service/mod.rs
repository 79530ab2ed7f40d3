//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model validation, resolver queries and persistence into
//!   use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod app_store;
