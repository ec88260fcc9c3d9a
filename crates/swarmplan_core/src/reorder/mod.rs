//! Drop reconciliation.
//!
//! # Responsibility
//! - Translate completed drag gestures into sort-order reassignment plans.
//! - Keep gesture bookkeeping behind a capability interface so planning is
//!   testable without pointer events.
//!
//! # Invariants
//! - Planning is pure over a store snapshot; it never mutates the store.
//! - A cancelled drag produces no event, no mutation, and no network call.

pub mod plan;
pub mod session;
