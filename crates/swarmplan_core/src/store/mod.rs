//! Canonical in-memory entity state.
//!
//! # Responsibility
//! - Hold the currently-loaded entities keyed by id.
//! - Provide the snapshot/restore handle used for optimistic rollback.
//!
//! # Invariants
//! - Writes validate the entity record before it becomes observable.
//! - Only the sync coordinator and lifecycle rules mutate the store; ordering
//!   and reorder logic read snapshots and never write.

pub mod entity_store;
