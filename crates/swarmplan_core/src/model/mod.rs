//! Unified domain model for the planning hierarchy.
//!
//! # Responsibility
//! - Define the canonical entity shape shared by domain/area/task levels.
//! - Keep one record layout so a single ordering engine serves every level.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`.
//! - Closing is represented by the `closed` flag plus a cleared `sort_order`,
//!   not by hard delete.

pub mod entity;
