//! Persistence bridging.
//!
//! # Responsibility
//! - Define the REST-shaped backend contract the engine persists through.
//! - Apply reorder and lifecycle results optimistically with rollback on
//!   persistence failure.
//!
//! # Invariants
//! - Persistence failures never propagate past the coordinator; they become
//!   rollback plus one user-facing notification.
//! - One batched call per drop, never one call per affected sibling.

pub mod backend;
pub mod coordinator;
