//! Optimistic persistence coordination.
//!
//! # Responsibility
//! - Apply reorder plans and lifecycle transitions to the store
//!   synchronously, then persist them through the backend.
//! - Roll back to the captured pre-state and queue one notification when a
//!   persistence call fails.
//!
//! # Invariants
//! - The snapshot is captured before the optimistic apply, never
//!   reconstructed afterwards.
//! - One batched call per drop; staged batches for the same containers
//!   supersede, so a stale payload can never regress a newer displayed
//!   order.
//! - This module is the sole recoverer of persistence failures.

use crate::lifecycle::{append_sort_order, reopen_sort_order, CreateRequest};
use crate::model::entity::{Container, Entity, EntityId, EntityKind};
use crate::reorder::plan::ReorderPlan;
use crate::store::entity_store::{
    EntityPatch, EntityStore, StoreError, StoreResult, StoreSnapshot,
};
use crate::sync::backend::{BackendError, EntityDraft, OrderRecord, PersistenceBackend};
use log::{error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by sync coordination.
#[derive(Debug)]
pub enum SyncError {
    /// Store rejected the operation (unknown id, invalid record).
    Store(StoreError),
    /// Backend call failed; the store has been rolled back.
    Persistence(BackendError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Transient, user-facing failure notice naming the failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub operation: &'static str,
    pub message: String,
}

/// One unsent batch: earliest pre-state, latest payload.
#[derive(Debug)]
struct StagedBatch {
    containers: Vec<Container>,
    snapshot: StoreSnapshot,
    records: BTreeMap<EntityId, OrderRecord>,
}

impl StagedBatch {
    fn touches_any(&self, containers: &[Container]) -> bool {
        self.containers
            .iter()
            .any(|container| containers.contains(container))
    }
}

/// Bridges in-memory reorder results to the persistence boundary.
pub struct SyncCoordinator<B: PersistenceBackend> {
    backend: B,
    staged: Vec<StagedBatch>,
    notifications: Vec<Notification>,
}

impl<B: PersistenceBackend> SyncCoordinator<B> {
    /// Creates a coordinator over one backend implementation.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            staged: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Drains queued failure notifications for display.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Whether unsent staged batches exist.
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Applies one reorder plan optimistically and persists it immediately.
    ///
    /// An unsent staged batch on the same containers is absorbed into this
    /// commit: flushing it afterwards would resend its stale orders over the
    /// newer ones. Absorption keeps the staged batch's earlier snapshot and
    /// this plan's records.
    ///
    /// On persistence failure the touched entities revert to their captured
    /// pre-state and exactly one notification is queued.
    pub fn commit_drop(&mut self, store: &mut EntityStore, plan: &ReorderPlan) -> SyncResult<()> {
        let mut snapshot = self.apply_optimistic(store, plan)?;
        let mut records = plan_records(plan);
        let containers = [plan.target_container, plan.source_container];

        for batch in std::mem::take(&mut self.staged) {
            if batch.touches_any(&containers) {
                let mut merged = batch.snapshot;
                merged.extend_missing(snapshot);
                snapshot = merged;
                let mut merged_records = batch.records;
                merged_records.extend(records);
                records = merged_records;
                info!("event=reorder_commit module=sync status=staged_absorbed");
            } else {
                self.staged.push(batch);
            }
        }

        let records: Vec<OrderRecord> = records.into_values().collect();

        match self.backend.push_order_batch(&records) {
            Ok(()) => {
                info!(
                    "event=reorder_commit module=sync status=ok records={} cross_container={}",
                    records.len(),
                    plan.is_cross_container()
                );
                Ok(())
            }
            Err(err) => {
                store.restore(snapshot);
                self.notify_failure("reorder", &err);
                Err(SyncError::Persistence(err))
            }
        }
    }

    /// Applies one reorder plan optimistically and stages its batch.
    ///
    /// A staged batch touching the same containers is superseded: the
    /// earliest snapshot is kept, the payload is replaced by the newest
    /// order. [`SyncCoordinator::flush`] sends staged batches.
    pub fn stage_drop(&mut self, store: &mut EntityStore, plan: &ReorderPlan) -> SyncResult<()> {
        let snapshot = self.apply_optimistic(store, plan)?;
        let records = plan_records(plan);
        let containers = vec![plan.target_container, plan.source_container];

        if let Some(batch) = self
            .staged
            .iter_mut()
            .find(|batch| batch.touches_any(&containers))
        {
            batch.snapshot.extend_missing(snapshot);
            batch.records.extend(records);
            for container in containers {
                if !batch.containers.contains(&container) {
                    batch.containers.push(container);
                }
            }
            info!("event=reorder_stage module=sync status=superseded");
        } else {
            self.staged.push(StagedBatch {
                containers,
                snapshot,
                records,
            });
            info!("event=reorder_stage module=sync status=queued");
        }
        Ok(())
    }

    /// Sends every staged batch, one round trip each.
    ///
    /// A failed batch rolls back exactly the entities it covered and queues
    /// one notification; remaining batches still flush. Returns the first
    /// failure.
    pub fn flush(&mut self, store: &mut EntityStore) -> SyncResult<()> {
        let staged = std::mem::take(&mut self.staged);
        let mut first_failure = None;

        for batch in staged {
            let records: Vec<OrderRecord> = batch.records.into_values().collect();
            match self.backend.push_order_batch(&records) {
                Ok(()) => {
                    info!(
                        "event=reorder_flush module=sync status=ok records={}",
                        records.len()
                    );
                }
                Err(err) => {
                    store.restore(batch.snapshot);
                    self.notify_failure("reorder", &err);
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        match first_failure {
            None => Ok(()),
            Some(err) => Err(SyncError::Persistence(err)),
        }
    }

    /// Creates one entity: backend first (it assigns the id), store insert
    /// after.
    pub fn commit_create(
        &mut self,
        store: &mut EntityStore,
        request: CreateRequest,
    ) -> SyncResult<EntityId> {
        let container = request.container();
        let sort_order = request
            .sort_order
            .unwrap_or_else(|| append_sort_order(store, container));

        let draft = EntityDraft {
            kind: request.kind,
            parent_id: request.parent_id,
            name: request.name.clone(),
            sort_order,
            priority: request.priority,
        };
        let id = match self.backend.create_entity(&draft) {
            Ok(id) => id,
            Err(err) => {
                self.notify_failure("create", &err);
                return Err(SyncError::Persistence(err));
            }
        };

        let mut entity = Entity::with_id(id, request.kind, request.parent_id, request.name);
        entity.sort_order = Some(sort_order);
        if request.kind == EntityKind::Task {
            entity.priority = request.priority;
        }
        if let Err(err) = store.insert(entity) {
            // The backend already holds this entity; surface the divergence
            // instead of dropping it silently.
            error!(
                "event=entity_create module=sync status=store_reject id={id} error={err}"
            );
            self.notifications.push(Notification {
                operation: "create",
                message: format!("entity {id} was created remotely but could not be loaded: {err}"),
            });
            return Err(err.into());
        }

        info!(
            "event=entity_create module=sync status=ok kind={:?} sort_order={sort_order}",
            request.kind
        );
        Ok(id)
    }

    /// Closes one entity: `closed = true`, `sort_order` cleared to null.
    ///
    /// Closing an already-closed entity is a no-op without a network call.
    /// Children of a closed parent keep their own orders untouched.
    pub fn commit_close(&mut self, store: &mut EntityStore, id: EntityId) -> SyncResult<()> {
        if store.get(id)?.closed {
            return Ok(());
        }

        let snapshot = store.capture([id])?;
        let patch = EntityPatch {
            closed: Some(true),
            sort_order: Some(None),
            ..EntityPatch::default()
        };
        if let Err(err) = store.apply(id, &patch) {
            store.restore(snapshot);
            return Err(err.into());
        }

        match self.backend.set_lifecycle(id, true, None) {
            Ok(()) => {
                info!("event=entity_close module=sync status=ok id={id}");
                Ok(())
            }
            Err(err) => {
                store.restore(snapshot);
                self.notify_failure("close", &err);
                Err(SyncError::Persistence(err))
            }
        }
    }

    /// Reopens one entity at the end of its open siblings.
    pub fn commit_reopen(&mut self, store: &mut EntityStore, id: EntityId) -> SyncResult<()> {
        let entity = store.get(id)?;
        if entity.is_open() {
            return Ok(());
        }
        let container = entity.container();
        let sort_order = reopen_sort_order(store, container);

        let snapshot = store.capture([id])?;
        let patch = EntityPatch {
            closed: Some(false),
            sort_order: Some(Some(sort_order)),
            ..EntityPatch::default()
        };
        if let Err(err) = store.apply(id, &patch) {
            store.restore(snapshot);
            return Err(err.into());
        }

        match self.backend.set_lifecycle(id, false, Some(sort_order)) {
            Ok(()) => {
                info!("event=entity_reopen module=sync status=ok id={id} sort_order={sort_order}");
                Ok(())
            }
            Err(err) => {
                store.restore(snapshot);
                self.notify_failure("reopen", &err);
                Err(SyncError::Persistence(err))
            }
        }
    }

    /// Captures the pre-state, then applies the plan. A store failure
    /// mid-apply restores the capture before propagating.
    fn apply_optimistic(
        &mut self,
        store: &mut EntityStore,
        plan: &ReorderPlan,
    ) -> SyncResult<StoreSnapshot> {
        let snapshot = store.capture(plan.assignments.iter().map(|assignment| assignment.id))?;
        if let Err(err) = apply_plan(store, plan) {
            store.restore(snapshot);
            return Err(err.into());
        }
        Ok(snapshot)
    }

    fn notify_failure(&mut self, operation: &'static str, err: &BackendError) {
        error!("event=persist_failed module=sync status=rollback operation={operation} error={err}");
        self.notifications.push(Notification {
            operation,
            message: format!("{operation} could not be saved: {err}"),
        });
    }
}

fn apply_plan(store: &mut EntityStore, plan: &ReorderPlan) -> StoreResult<()> {
    for assignment in &plan.assignments {
        let patch = match assignment.parent_id {
            Some(parent_id) => EntityPatch::reparent(parent_id, assignment.sort_order),
            None => EntityPatch::order(assignment.sort_order),
        };
        store.apply(assignment.id, &patch)?;
    }
    Ok(())
}

fn plan_records(plan: &ReorderPlan) -> BTreeMap<EntityId, OrderRecord> {
    plan.assignments
        .iter()
        .map(|assignment| {
            (
                assignment.id,
                OrderRecord {
                    id: assignment.id,
                    sort_order: Some(assignment.sort_order),
                    parent_id: assignment.parent_id,
                },
            )
        })
        .collect()
}
