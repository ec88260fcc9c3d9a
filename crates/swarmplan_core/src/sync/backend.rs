//! Persistence backend contract and wire records.
//!
//! # Responsibility
//! - Define the batched update, create, and lifecycle endpoints the engine
//!   requires from its transport.
//! - Pin the wire shape of ordering records.
//!
//! # Invariants
//! - A batch is applied all-or-nothing server-side; a partial failure is
//!   reported (and treated) as a total failure.
//! - `sort_order` serializes as an explicit null when cleared, so the close
//!   path can null the column server-side.

use crate::model::entity::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failed before a response arrived.
    Network(String),
    /// Backend answered with a non-2xx status.
    Status { code: u16, message: String },
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network failure: {message}"),
            Self::Status { code, message } => {
                write!(f, "backend rejected request ({code}): {message}")
            }
        }
    }
}

impl Error for BackendError {}

/// One ordering record of a batched update.
///
/// `parent_id` is present only for the reparented item of a cross-container
/// move; `sort_order: None` serializes as the literal null used to clear the
/// column on close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: EntityId,
    pub sort_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<EntityId>,
}

/// Creation payload; the backend assigns and returns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDraft {
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<EntityId>,
    pub name: String,
    pub sort_order: i64,
    pub priority: bool,
}

/// Persistence boundary required by the sync coordinator.
///
/// Implementations wrap the actual REST transport; tests substitute mocks.
pub trait PersistenceBackend {
    /// Persists one batched ordering update in a single round trip.
    fn push_order_batch(&mut self, records: &[OrderRecord]) -> BackendResult<()>;
    /// Persists one new entity and returns its assigned id.
    fn create_entity(&mut self, draft: &EntityDraft) -> BackendResult<EntityId>;
    /// Persists a close/reopen transition, including the cleared
    /// `sort_order` on close.
    fn set_lifecycle(
        &mut self,
        id: EntityId,
        closed: bool,
        sort_order: Option<i64>,
    ) -> BackendResult<()>;
}
