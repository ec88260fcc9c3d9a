//! Display-order derivation.
//!
//! # Responsibility
//! - Derive deterministic display sequences from stored entities.
//! - Keep derivation stateless so every render reads fresh store state.
//!
//! # Invariants
//! - Derivation never mutates entities.
//! - Equal `sort_order` (must not occur among open siblings) falls back to
//!   id ascending for determinism.

pub mod order;
