//! Ordered-collection reconciliation engine for the SwarmPlan client.
//! This crate is the single source of truth for ordering invariants.

pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod policy;
pub mod prefs;
pub mod reorder;
pub mod store;
pub mod sync;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use lifecycle::{append_sort_order, reopen_sort_order, CreateRequest, CreationTemplate};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{
    Container, Entity, EntityId, EntityKind, EntityValidationError, SortMode,
};
pub use policy::order::{
    container_display_order, container_mode, display_order, management_order,
};
pub use prefs::{
    PrefsError, PrefsResult, SelectionContext, SelectionStore, SqliteSelectionStore,
    SELECTED_DOMAIN_KEY,
};
pub use reorder::plan::{
    plan_reorder, DropEvent, DropPosition, ReorderError, ReorderPlan, SortAssignment,
};
pub use reorder::session::{DragSession, EdgeHint};
pub use store::entity_store::{
    EntityPatch, EntityStore, StoreError, StoreResult, StoreSnapshot,
};
pub use sync::backend::{
    BackendError, BackendResult, EntityDraft, OrderRecord, PersistenceBackend,
};
pub use sync::coordinator::{Notification, SyncCoordinator, SyncError, SyncResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
