//! Lifecycle normalization rules.
//!
//! # Responsibility
//! - Define the sort-order side effects of create, close, and reopen.
//! - Provide the template-row creation affordance.
//!
//! # Invariants
//! - Create appends at `count(open siblings)` unless an explicit position is
//!   supplied (bulk/import paths).
//! - Reopen appends at `max(open sort_order) + 1`, or 0 with no open
//!   siblings.
//! - A template is never a store entity; each confirmation yields exactly
//!   one creation request.

use crate::model::entity::{Container, EntityId, EntityKind};
use crate::store::entity_store::EntityStore;

/// Caller-facing creation request, normalized into a backend draft and a
/// store insert by the sync coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub kind: EntityKind,
    pub parent_id: Option<EntityId>,
    pub name: String,
    /// Task priority flag; ignored for other kinds.
    pub priority: bool,
    /// Explicit position for bulk/import paths; `None` appends at end.
    pub sort_order: Option<i64>,
}

impl CreateRequest {
    /// Sibling container the new entity will join.
    pub fn container(&self) -> Container {
        Container {
            kind: self.kind,
            parent_id: self.parent_id,
        }
    }
}

/// Position assigned to a freshly created entity: append after all open
/// siblings.
///
/// With contiguous orders this equals `count(open siblings)`. Closing leaves
/// gaps without renumbering the remaining siblings, so the count alone could
/// collide with a surviving order; the open maximum bounds it from below.
pub fn append_sort_order(store: &EntityStore, container: Container) -> i64 {
    let siblings = store.list(container);
    let open_count = siblings.iter().filter(|entity| entity.is_open()).count() as i64;
    let open_max = siblings
        .iter()
        .filter(|entity| entity.is_open())
        .filter_map(|entity| entity.sort_order)
        .max();
    match open_max {
        None => 0,
        Some(max) => open_count.max(max + 1),
    }
}

/// Position assigned to a reopened entity: one past the open maximum.
pub fn reopen_sort_order(store: &EntityStore, container: Container) -> i64 {
    store
        .list(container)
        .iter()
        .filter(|entity| entity.is_open())
        .filter_map(|entity| entity.sort_order)
        .max()
        .map_or(0, |max| max + 1)
}

/// Perpetual blank row used as the creation affordance.
///
/// The template buffers input until an explicit confirmation; losing focus
/// simply never calls [`CreationTemplate::confirm`]. A successful
/// confirmation resets the buffer, leaving a fresh template in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationTemplate {
    kind: EntityKind,
    parent_id: Option<EntityId>,
    name: String,
    priority: bool,
}

impl CreationTemplate {
    /// Creates a blank template for one container.
    pub fn new(container: Container) -> Self {
        Self {
            kind: container.kind,
            parent_id: container.parent_id,
            name: String::new(),
            priority: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.name = value.into();
    }

    pub fn set_priority(&mut self, value: bool) {
        self.priority = value;
    }

    /// Whether confirmation would currently produce a request.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Confirms the template.
    ///
    /// Returns `None` for blank input. On success the buffer resets, so one
    /// confirmation produces exactly one creation request.
    pub fn confirm(&mut self) -> Option<CreateRequest> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return None;
        }
        let request = CreateRequest {
            kind: self.kind,
            parent_id: self.parent_id,
            name: trimmed.to_string(),
            priority: self.priority,
            sort_order: None,
        };
        self.name.clear();
        self.priority = false;
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::CreationTemplate;
    use crate::model::entity::Container;
    use uuid::Uuid;

    #[test]
    fn blank_template_does_not_confirm() {
        let mut template = CreationTemplate::new(Container::tasks_of(Uuid::new_v4()));
        template.set_name("   ");
        assert!(template.confirm().is_none());
    }

    #[test]
    fn confirm_yields_once_and_resets() {
        let area = Uuid::new_v4();
        let mut template = CreationTemplate::new(Container::tasks_of(area));
        template.set_name("  write report ");
        template.set_priority(true);

        let request = template.confirm().expect("non-blank input should confirm");
        assert_eq!(request.name, "write report");
        assert!(request.priority);
        assert_eq!(request.parent_id, Some(area));

        assert!(template.is_blank());
        assert!(template.confirm().is_none());
    }
}
