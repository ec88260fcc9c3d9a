//! Reorder planning.
//!
//! # Responsibility
//! - Compute the sort-order reassignments realizing one drop event.
//! - Detect no-op drops so they skip mutation and persistence entirely.
//!
//! # Invariants
//! - Insertion index is computed against the target container's display
//!   sequence in its active mode, with the source excluded.
//! - The resulting sequence renumbers contiguously from 0; a full-container
//!   renumber rules out duplicate-order states.
//! - Cross-container plans also close the gap in the source container and
//!   reparent the source item.

use crate::model::entity::{Container, Entity, EntityId};
use crate::policy::order::container_display_order;
use crate::store::entity_store::EntityStore;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Where the source lands relative to the target container's display
/// sequence.
///
/// `Before`/`After` carry the above/below-midline decision made by the
/// gesture layer; `End` is a drop on the container itself or empty space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    /// Insert immediately before the given sibling.
    Before(EntityId),
    /// Insert immediately after the given sibling.
    After(EntityId),
    /// Append at the end of the container.
    End,
}

/// One completed drop reported by the gesture layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropEvent {
    pub source_id: EntityId,
    pub source_container: Container,
    pub target_container: Container,
    pub position: DropPosition,
}

/// One computed sort-order reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortAssignment {
    pub id: EntityId,
    pub sort_order: i64,
    /// New parent, set only for the reparented source of a cross-container
    /// move.
    pub parent_id: Option<EntityId>,
}

/// Full reassignment set realizing one drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub target_container: Container,
    pub source_container: Container,
    /// Minimal set of changed records; unchanged siblings are omitted.
    pub assignments: Vec<SortAssignment>,
}

impl ReorderPlan {
    /// Whether this plan moves the source between containers.
    pub fn is_cross_container(&self) -> bool {
        self.source_container != self.target_container
    }
}

/// Errors from reorder planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    /// Drop event references a source id absent from the store.
    UnknownSource(EntityId),
    /// Drop event references a target sibling absent from the target
    /// container's open sequence.
    UnknownTarget(EntityId),
    /// Source entity kind does not match the target container.
    KindMismatch {
        source: EntityId,
        target: Container,
    },
    /// Computed plan would leave duplicate open sort orders. Must never
    /// occur; fatal during development.
    InvariantViolation(Container),
}

impl Display for ReorderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSource(id) => write!(f, "drop source not found: {id}"),
            Self::UnknownTarget(id) => write!(f, "drop target not found: {id}"),
            Self::KindMismatch { source, target } => write!(
                f,
                "source {source} cannot move into {:?} container",
                target.kind
            ),
            Self::InvariantViolation(container) => write!(
                f,
                "duplicate open sort orders computed for {:?} container",
                container.kind
            ),
        }
    }
}

impl Error for ReorderError {}

/// Computes the reassignments realizing one drop event.
///
/// Returns `Ok(None)` when the drop changes nothing (same-spot drop); the
/// caller must then skip both mutation and persistence.
pub fn plan_reorder(
    store: &EntityStore,
    event: &DropEvent,
) -> Result<Option<ReorderPlan>, ReorderError> {
    let source = store
        .get(event.source_id)
        .map_err(|_| ReorderError::UnknownSource(event.source_id))?;
    if source.kind != event.target_container.kind {
        return Err(ReorderError::KindMismatch {
            source: source.id,
            target: event.target_container,
        });
    }

    // The store is canonical for the source's current container; a stale
    // source_container in the event must not detach the item from where it
    // actually lives.
    let source_container = source.container();
    let cross_container = source_container != event.target_container;

    let mut target_sequence: Vec<&Entity> = container_display_order(store, event.target_container)
        .into_iter()
        .filter(|entity| entity.id != event.source_id)
        .collect();

    let insert_at = match event.position {
        DropPosition::Before(target_id) => position_of(&target_sequence, target_id)?,
        DropPosition::After(target_id) => position_of(&target_sequence, target_id)? + 1,
        DropPosition::End => target_sequence.len(),
    };
    target_sequence.insert(insert_at, source);

    let mut assignments = Vec::new();
    for (index, entity) in target_sequence.iter().enumerate() {
        let desired = index as i64;
        let reparented = entity.id == event.source_id && cross_container;
        if entity.sort_order != Some(desired) || reparented {
            assignments.push(SortAssignment {
                id: entity.id,
                sort_order: desired,
                parent_id: if reparented {
                    event.target_container.parent_id
                } else {
                    None
                },
            });
        }
    }

    if cross_container {
        let remaining = container_display_order(store, source_container);
        for (index, entity) in remaining
            .iter()
            .filter(|entity| entity.id != event.source_id)
            .enumerate()
        {
            let desired = index as i64;
            if entity.sort_order != Some(desired) {
                assignments.push(SortAssignment {
                    id: entity.id,
                    sort_order: desired,
                    parent_id: None,
                });
            }
        }
    }

    if assignments.is_empty() {
        return Ok(None);
    }

    let plan = ReorderPlan {
        target_container: event.target_container,
        source_container,
        assignments,
    };
    verify_unique_orders(store, &plan)?;
    Ok(Some(plan))
}

fn position_of(sequence: &[&Entity], target_id: EntityId) -> Result<usize, ReorderError> {
    sequence
        .iter()
        .position(|entity| entity.id == target_id)
        .ok_or(ReorderError::UnknownTarget(target_id))
}

/// Defensive check: after virtually applying the plan, open siblings of both
/// touched containers must hold unique sort orders.
fn verify_unique_orders(store: &EntityStore, plan: &ReorderPlan) -> Result<(), ReorderError> {
    for container in [plan.target_container, plan.source_container] {
        let mut seen = HashSet::new();
        for entity in store.list(container) {
            if !entity.is_open() {
                continue;
            }
            let assigned = plan
                .assignments
                .iter()
                .find(|assignment| assignment.id == entity.id);
            // A reparented source is counted in its new container only.
            let moved_away = assigned
                .map(|assignment| {
                    assignment.parent_id.is_some()
                        && container != plan.target_container
                })
                .unwrap_or(false);
            if moved_away {
                continue;
            }
            let order = assigned
                .map(|assignment| Some(assignment.sort_order))
                .unwrap_or(entity.sort_order);
            if let Some(order) = order {
                if !seen.insert(order) {
                    return Err(ReorderError::InvariantViolation(container));
                }
            }
        }
        // The moved source joins the target container's group.
        if container == plan.target_container && plan.is_cross_container() {
            if let Some(assignment) = plan
                .assignments
                .iter()
                .find(|assignment| assignment.parent_id.is_some())
            {
                if !seen.insert(assignment.sort_order) {
                    return Err(ReorderError::InvariantViolation(container));
                }
            }
        }
    }
    Ok(())
}
