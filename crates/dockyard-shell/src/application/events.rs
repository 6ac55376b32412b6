//! Notifications driving a layout controller.

use std::time::Duration;

use dockyard_core::{DockDefinition, EntityId, LeafDefinition};

use crate::application::recreate_view::RecreateStep;
use crate::infrastructure::platform::ViewId;

/// Everything the event loop can deliver to a
/// [`LayoutController`](crate::application::manage_layout::LayoutController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// Screens were attached, detached, or the primary screen changed.
    ScreensChanged,
    /// A definition entered or left the destroyed (undo-able) state.
    DestroyedChanged { definition: EntityId, destroyed: bool },
    /// A new definition appeared in the layout.
    DefinitionAdded(DockDefinition),
    /// A definition was deleted for good.
    DefinitionRemoved(EntityId),
    /// A leaf was added to a live container.  Tray applets carry the id of
    /// the tray container they host.
    LeafAdded {
        container: EntityId,
        leaf: LeafDefinition,
    },
    /// The platform finished destroying a view.
    ViewDestroyed(ViewId),
    /// Someone asked for a view to be rebuilt.
    RecreateRequested(EntityId),
    /// A step of a pending recreation is due.
    Recreate(RecreateStep),
    /// Stop the event loop.
    Shutdown,
}

/// An event to post back to the loop once `delay` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub delay: Duration,
    pub event: ShellEvent,
}

impl Scheduled {
    pub fn after(delay: Duration, event: ShellEvent) -> Self {
        Self { delay, event }
    }
}
