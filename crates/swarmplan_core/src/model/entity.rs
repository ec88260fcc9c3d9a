//! Entity domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by domain/area/task projections.
//! - Provide lifecycle helpers for open/closed ordering semantics.
//!
//! # Invariants
//! - `id` is stable and never reused for another entity.
//! - `closed == true` exactly when `sort_order` is `None`.
//! - `sort_mode` is meaningful only for areas; `priority`/`done` only for
//!   tasks.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every entity in the planning hierarchy.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EntityId = Uuid;

/// Hierarchy level of an entity.
///
/// The same record shape and ordering engine serve all three levels; `kind`
/// selects which sibling group an entity competes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Top-level grouping; owns areas.
    Domain,
    /// Mid-level grouping inside a domain; owns tasks.
    Area,
    /// Leaf work item inside an area.
    Task,
}

impl EntityKind {
    /// Returns the kind of children this kind owns, if any.
    pub fn child_kind(self) -> Option<EntityKind> {
        match self {
            Self::Domain => Some(Self::Area),
            Self::Area => Some(Self::Task),
            Self::Task => None,
        }
    }
}

/// Per-area display ordering mode for its tasks.
///
/// Switching mode never rewrites stored `sort_order`; it only changes which
/// derivation the ordering policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Priority-flagged tasks group before the rest.
    Priority,
    /// Display order strictly follows stored `sort_order`.
    Hand,
}

/// Sibling-group address: all entities of one kind under one parent.
///
/// The domain list is the container with `parent_id = None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Container {
    /// Kind of the entities inside this container.
    pub kind: EntityKind,
    /// Owning entity. `None` only for the top-level domain list.
    pub parent_id: Option<EntityId>,
}

impl Container {
    /// Top-level domain container.
    pub fn domains() -> Self {
        Self {
            kind: EntityKind::Domain,
            parent_id: None,
        }
    }

    /// Area container of one domain.
    pub fn areas_of(domain_id: EntityId) -> Self {
        Self {
            kind: EntityKind::Area,
            parent_id: Some(domain_id),
        }
    }

    /// Task container of one area.
    pub fn tasks_of(area_id: EntityId) -> Self {
        Self {
            kind: EntityKind::Task,
            parent_id: Some(area_id),
        }
    }
}

/// Validation failures for entity records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    /// `closed` and `sort_order` disagree.
    ClosedOrderMismatch(EntityId),
    /// `sort_mode` set on a non-area entity.
    SortModeOnNonArea(EntityId),
    /// Task flag set on a non-task entity.
    TaskFlagOnNonTask(EntityId),
    /// Non-domain entity without a parent reference.
    MissingParent(EntityId),
    /// Domain entity carrying a parent reference.
    UnexpectedParent(EntityId),
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClosedOrderMismatch(id) => {
                write!(f, "closed flag and sort_order disagree for entity {id}")
            }
            Self::SortModeOnNonArea(id) => {
                write!(f, "sort_mode set on non-area entity {id}")
            }
            Self::TaskFlagOnNonTask(id) => {
                write!(f, "task flag set on non-task entity {id}")
            }
            Self::MissingParent(id) => write!(f, "entity {id} requires a parent"),
            Self::UnexpectedParent(id) => write!(f, "domain entity {id} must not have a parent"),
        }
    }
}

impl Error for EntityValidationError {}

/// Canonical record for one domain, area, or task.
///
/// Optional projection fields keep a single shape usable by every level
/// without copying data between per-level structs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Stable global ID used for linking and persistence mapping.
    pub id: EntityId,
    /// Hierarchy level.
    pub kind: EntityKind,
    /// Owning entity; `None` only for domains.
    pub parent_id: Option<EntityId>,
    /// Domain/area name or task description.
    pub name: String,
    /// Soft-close flag; closed entities leave the open ordering.
    pub closed: bool,
    /// Position among open siblings. `None` exactly when `closed`.
    pub sort_order: Option<i64>,
    /// Task ordering mode. Meaningful only when `kind == Area`.
    pub sort_mode: Option<SortMode>,
    /// Priority display flag. Meaningful only when `kind == Task`.
    pub priority: bool,
    /// Completion display flag. Meaningful only when `kind == Task`.
    pub done: bool,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

impl Entity {
    /// Creates a new open entity with a generated stable ID.
    ///
    /// The caller assigns `sort_order` through the lifecycle rules before
    /// inserting into the store.
    pub fn new(kind: EntityKind, parent_id: Option<EntityId>, name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, parent_id, name)
    }

    /// Creates a new open entity with a caller-provided stable ID.
    ///
    /// Used by load paths where identity already exists on the backend.
    pub fn with_id(
        id: EntityId,
        kind: EntityKind,
        parent_id: Option<EntityId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            parent_id,
            name: name.into(),
            closed: false,
            sort_order: Some(0),
            sort_mode: if kind == EntityKind::Area {
                Some(SortMode::Hand)
            } else {
                None
            },
            priority: false,
            done: false,
            created_at: epoch_ms_now(),
        }
    }

    /// Returns whether this entity participates in the open ordering.
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Returns the sibling container this entity belongs to.
    pub fn container(&self) -> Container {
        Container {
            kind: self.kind,
            parent_id: self.parent_id,
        }
    }

    /// Checks structural invariants of this record.
    pub fn validate(&self) -> Result<(), EntityValidationError> {
        if self.closed != self.sort_order.is_none() {
            return Err(EntityValidationError::ClosedOrderMismatch(self.id));
        }
        if self.sort_mode.is_some() && self.kind != EntityKind::Area {
            return Err(EntityValidationError::SortModeOnNonArea(self.id));
        }
        if (self.priority || self.done) && self.kind != EntityKind::Task {
            return Err(EntityValidationError::TaskFlagOnNonTask(self.id));
        }
        match (self.kind, self.parent_id) {
            (EntityKind::Domain, Some(_)) => Err(EntityValidationError::UnexpectedParent(self.id)),
            (EntityKind::Domain, None) => Ok(()),
            (_, None) => Err(EntityValidationError::MissingParent(self.id)),
            (_, Some(_)) => Ok(()),
        }
    }
}

fn epoch_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
