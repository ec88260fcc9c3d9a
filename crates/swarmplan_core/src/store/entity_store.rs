//! In-memory entity store and rollback snapshots.
//!
//! # Responsibility
//! - Provide get/list/apply/replace_all over loaded entities.
//! - Capture pre-state snapshots consumed by rollback.
//!
//! # Invariants
//! - Every successful `apply` is observable by the next read; no caching.
//! - `list` returns storage order (id ascending), never display order.
//! - Snapshots are captured before an optimistic apply, not reconstructed
//!   after the fact.

use crate::model::entity::{Container, Entity, EntityId, EntityValidationError, SortMode};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from entity store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Operation references an id absent from the store.
    NotFound(EntityId),
    /// Entity already present under the same id.
    DuplicateId(EntityId),
    /// Bulk-loaded entity does not belong to the container being replaced.
    ContainerMismatch(EntityId),
    /// Write would leave an invalid entity record.
    Validation(EntityValidationError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::DuplicateId(id) => write!(f, "entity already exists: {id}"),
            Self::ContainerMismatch(id) => {
                write!(f, "entity {id} does not belong to the replaced container")
            }
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::DuplicateId(_) | Self::ContainerMismatch(_) => None,
        }
    }
}

impl From<EntityValidationError> for StoreError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Partial update applied by id.
///
/// `sort_order` is doubly optional so a patch can distinguish "leave as is"
/// from "clear to null" (the close path).
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub closed: Option<bool>,
    pub sort_order: Option<Option<i64>>,
    pub sort_mode: Option<SortMode>,
    pub priority: Option<bool>,
    pub done: Option<bool>,
    pub parent_id: Option<EntityId>,
}

impl EntityPatch {
    /// Patch assigning a new open position.
    pub fn order(sort_order: i64) -> Self {
        Self {
            sort_order: Some(Some(sort_order)),
            ..Self::default()
        }
    }

    /// Patch assigning a new open position under a new parent.
    pub fn reparent(parent_id: EntityId, sort_order: i64) -> Self {
        Self {
            parent_id: Some(parent_id),
            sort_order: Some(Some(sort_order)),
            ..Self::default()
        }
    }
}

/// Pre-state of the entities touched by one mutation.
///
/// Capturing returns a handle; failure consumes it to restore the prior
/// records, success discards it.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    entries: Vec<Entity>,
}

impl StoreSnapshot {
    /// Ids covered by this snapshot.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|entity| entity.id)
    }

    /// Whether the snapshot already covers the given id.
    pub fn covers(&self, id: EntityId) -> bool {
        self.entries.iter().any(|entity| entity.id == id)
    }

    /// Folds in entries from a later capture without overwriting existing
    /// ones.
    ///
    /// A superseded batch keeps the earliest captured pre-state per id, so
    /// rollback lands on the state before the first optimistic apply.
    pub fn extend_missing(&mut self, addition: StoreSnapshot) {
        for entity in addition.entries {
            if !self.covers(entity.id) {
                self.entries.push(entity);
            }
        }
    }
}

/// Canonical in-memory state of all loaded entities.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Loads one entity by id.
    pub fn get(&self, id: EntityId) -> StoreResult<&Entity> {
        self.entities.get(&id).ok_or(StoreError::NotFound(id))
    }

    /// Lists the members of one container in storage order (id ascending).
    ///
    /// Storage order carries no display meaning; callers derive display
    /// order through the ordering policy.
    pub fn list(&self, container: Container) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|entity| entity.container() == container)
            .collect()
    }

    /// Inserts one validated entity.
    pub fn insert(&mut self, entity: Entity) -> StoreResult<()> {
        entity.validate()?;
        if self.entities.contains_key(&entity.id) {
            return Err(StoreError::DuplicateId(entity.id));
        }
        self.entities.insert(entity.id, entity);
        Ok(())
    }

    /// Permanently removes one entity.
    pub fn remove(&mut self, id: EntityId) -> StoreResult<Entity> {
        self.entities.remove(&id).ok_or(StoreError::NotFound(id))
    }

    /// Applies a partial update by id and returns the updated record.
    pub fn apply(&mut self, id: EntityId, patch: &EntityPatch) -> StoreResult<&Entity> {
        let current = self.entities.get(&id).ok_or(StoreError::NotFound(id))?;

        let mut updated = current.clone();
        if let Some(name) = &patch.name {
            updated.name = name.clone();
        }
        if let Some(closed) = patch.closed {
            updated.closed = closed;
        }
        if let Some(sort_order) = patch.sort_order {
            updated.sort_order = sort_order;
        }
        if let Some(sort_mode) = patch.sort_mode {
            updated.sort_mode = Some(sort_mode);
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(done) = patch.done {
            updated.done = done;
        }
        if let Some(parent_id) = patch.parent_id {
            updated.parent_id = Some(parent_id);
        }
        updated.validate()?;

        self.entities.insert(id, updated);
        Ok(&self.entities[&id])
    }

    /// Replaces the full membership of one container from a bulk load.
    ///
    /// Every replacement entity must belong to the given container.
    pub fn replace_all(&mut self, container: Container, entities: Vec<Entity>) -> StoreResult<()> {
        for entity in &entities {
            entity.validate()?;
            if entity.container() != container {
                return Err(StoreError::ContainerMismatch(entity.id));
            }
        }

        self.entities
            .retain(|_, entity| entity.container() != container);
        for entity in entities {
            self.entities.insert(entity.id, entity);
        }
        Ok(())
    }

    /// Captures the current state of the given ids.
    ///
    /// Fails with `NotFound` when any id is unknown; a partial snapshot
    /// could not restore a consistent pre-state.
    pub fn capture(
        &self,
        ids: impl IntoIterator<Item = EntityId>,
    ) -> StoreResult<StoreSnapshot> {
        let mut entries = Vec::new();
        for id in ids {
            entries.push(self.get(id)?.clone());
        }
        Ok(StoreSnapshot { entries })
    }

    /// Restores every entity covered by the snapshot to its captured state.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        for entity in snapshot.entries {
            self.entities.insert(entity.id, entity);
        }
    }
}
