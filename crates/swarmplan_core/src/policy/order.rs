//! Ordering policy functions.
//!
//! # Responsibility
//! - Turn one sibling group into the sequence a view renders.
//! - Resolve which mode governs a container.
//!
//! # Invariants
//! - Open entities order ascending by `(sort_order, id)`.
//! - Priority mode groups priority-true before priority-false; it never
//!   moves rows in the underlying store.
//! - Closed entities sort strictly after all open entities, by id ascending.

use crate::model::entity::{Container, Entity, EntityKind, SortMode};
use crate::store::entity_store::EntityStore;

/// Derives the open display sequence for one sibling group.
///
/// Closed entities are excluded entirely; management views that still show
/// them use [`management_order`].
pub fn display_order<'a>(siblings: &[&'a Entity], mode: SortMode) -> Vec<&'a Entity> {
    let mut open: Vec<&Entity> = siblings
        .iter()
        .copied()
        .filter(|entity| entity.is_open())
        .collect();
    open.sort_by_key(|entity| open_sort_key(entity, mode));
    open
}

/// Derives the management sequence: open order first, closed entities after.
///
/// Closed entities order by id ascending; stable but not semantically
/// meaningful.
pub fn management_order<'a>(siblings: &[&'a Entity], mode: SortMode) -> Vec<&'a Entity> {
    let mut sequence = display_order(siblings, mode);
    let mut closed: Vec<&Entity> = siblings
        .iter()
        .copied()
        .filter(|entity| !entity.is_open())
        .collect();
    closed.sort_by_key(|entity| entity.id);
    sequence.extend(closed);
    sequence
}

/// Resolves the ordering mode active for one container.
///
/// Task containers follow their area's `sort_mode`; domain and area
/// containers always use hand ordering.
pub fn container_mode(store: &EntityStore, container: Container) -> SortMode {
    if container.kind != EntityKind::Task {
        return SortMode::Hand;
    }
    container
        .parent_id
        .and_then(|area_id| store.get(area_id).ok())
        .and_then(|area| area.sort_mode)
        .unwrap_or(SortMode::Hand)
}

/// Convenience: derives the open display sequence straight from the store.
pub fn container_display_order(store: &EntityStore, container: Container) -> Vec<&Entity> {
    let mode = container_mode(store, container);
    let siblings = store.list(container);
    display_order(&siblings, mode)
}

fn open_sort_key(entity: &Entity, mode: SortMode) -> (bool, i64, uuid::Uuid) {
    // Open entities always carry Some(sort_order); the MAX fallback keeps
    // the derivation total if that invariant is ever violated upstream.
    let order = entity.sort_order.unwrap_or(i64::MAX);
    match mode {
        SortMode::Hand => (false, order, entity.id),
        SortMode::Priority => (!entity.priority, order, entity.id),
    }
}
