//! Drag gesture capability interface.
//!
//! # Responsibility
//! - Track one in-flight drag (source, current hover) independently of any
//!   gesture library's event sequence.
//! - Produce at most one `DropEvent` per drag, on completion only.
//!
//! # Invariants
//! - A drag without a valid hover completes as a cancellation: no event.
//! - Hover state is consumed by `complete`/`cancel`; nothing dangles after
//!   the drag ends.
//! - The dragged item is never its own drop target.

use crate::model::entity::{Container, EntityId};
use crate::reorder::plan::{DropEvent, DropPosition};

/// Pointer position relative to the hovered sibling's visual midline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeHint {
    /// Upper half: insert before the hovered sibling.
    Above,
    /// Lower half: insert after the hovered sibling.
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hover {
    Item {
        container: Container,
        target_id: EntityId,
        edge: EdgeHint,
    },
    Container(Container),
}

/// One in-flight drag gesture.
///
/// The rendering layer maps its gesture library's callbacks onto
/// `begin`/`over_*`/`complete`/`cancel`; both same-list and cross-card
/// gesture backends collapse onto this single interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    source_id: EntityId,
    source_container: Container,
    hover: Option<Hover>,
}

impl DragSession {
    /// Starts a drag for one source item.
    pub fn begin(source_id: EntityId, source_container: Container) -> Self {
        Self {
            source_id,
            source_container,
            hover: None,
        }
    }

    pub fn source_id(&self) -> EntityId {
        self.source_id
    }

    /// Records a hover over a sibling with an above/below midline hint.
    ///
    /// Hovering the dragged item itself clears the pending target instead;
    /// re-hovering replaces any prior hover.
    pub fn over_item(&mut self, container: Container, target_id: EntityId, edge: EdgeHint) {
        if target_id == self.source_id {
            self.hover = None;
            return;
        }
        self.hover = Some(Hover::Item {
            container,
            target_id,
            edge,
        });
    }

    /// Records a hover over a container's empty space (drop-at-end).
    pub fn over_container(&mut self, container: Container) {
        self.hover = Some(Hover::Container(container));
    }

    /// Clears the current hover; a subsequent `complete` cancels.
    pub fn clear_hover(&mut self) {
        self.hover = None;
    }

    /// Ends the drag with a drop.
    ///
    /// Returns `None` when no valid hover is pending; that path is a
    /// cancellation and must reach neither the store nor the network.
    pub fn complete(self) -> Option<DropEvent> {
        let hover = self.hover?;
        let (target_container, position) = match hover {
            Hover::Item {
                container,
                target_id,
                edge,
            } => match edge {
                EdgeHint::Above => (container, DropPosition::Before(target_id)),
                EdgeHint::Below => (container, DropPosition::After(target_id)),
            },
            Hover::Container(container) => (container, DropPosition::End),
        };
        Some(DropEvent {
            source_id: self.source_id,
            source_container: self.source_container,
            target_container,
            position,
        })
    }

    /// Ends the drag without a drop. Consumes the session and all hover
    /// state.
    pub fn cancel(self) {}
}
