//! Headless window platform.
//!
//! Used by the `dockyard` binary when no compositor integration is compiled
//! in.  Views exist only as log lines; destruction is reported back to the
//! event loop immediately.

use dockyard_core::{Edge, EntityId, Screen, ScreenTopology};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::{DockView, PlatformError, ViewId, ViewRequest, WindowPlatform};
use crate::application::events::ShellEvent;

/// A platform with a fixed set of screens.
pub struct HeadlessPlatform {
    topology: ScreenTopology,
    events: UnboundedSender<ShellEvent>,
}

impl HeadlessPlatform {
    pub fn new(topology: ScreenTopology, events: UnboundedSender<ShellEvent>) -> Self {
        Self { topology, events }
    }

    /// A single primary screen named `default`.
    pub fn single_screen(events: UnboundedSender<ShellEvent>) -> Self {
        Self::new(
            ScreenTopology::new(vec![Screen::new("default", 0, true)]),
            events,
        )
    }
}

impl WindowPlatform for HeadlessPlatform {
    fn topology(&self) -> ScreenTopology {
        self.topology.clone()
    }

    fn create_view(&mut self, request: ViewRequest) -> Result<Box<dyn DockView>, PlatformError> {
        info!(
            "creating view {} on {} at {}",
            request.view_id, request.screen.name, request.edge
        );
        Ok(Box::new(HeadlessView {
            view_id: request.view_id,
            definition: None,
            screen_name: request.screen.name,
            edge: request.edge,
        }))
    }

    fn destroy_later(&mut self, view_id: ViewId, view: Box<dyn DockView>) {
        debug!("destroying view {view_id} on {}", view.current_screen_name());
        drop(view);
        let _ = self.events.send(ShellEvent::ViewDestroyed(view_id));
    }
}

struct HeadlessView {
    view_id: ViewId,
    definition: Option<EntityId>,
    screen_name: String,
    edge: Edge,
}

impl DockView for HeadlessView {
    fn bind_definition(&mut self, definition: EntityId) {
        self.definition = Some(definition);
    }

    fn show(&mut self) {
        if let Some(definition) = self.definition {
            info!("view {} shows dock {definition}", self.view_id);
        }
    }

    fn current_screen_name(&self) -> String {
        self.screen_name.clone()
    }

    fn location(&self) -> Edge {
        self.edge
    }

    fn reverify_screen(&mut self, target: &Screen) {
        if self.screen_name != target.name {
            info!(
                "view {} moves from {} to {}",
                self.view_id, self.screen_name, target.name
            );
            self.screen_name = target.name.clone();
        }
    }

    fn disconnect_platform_signals(&mut self) {}

    fn force_on_primary(&mut self) {}
}
