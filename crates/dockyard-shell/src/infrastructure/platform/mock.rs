//! Mock window platform for unit and integration testing.
//!
//! Records every created and destroyed view so tests can assert on them
//! without a running compositor.  The mock is `Clone`: keep one clone in the
//! test and box the other into the controller.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use dockyard_core::{Edge, EntityId, Screen, ScreenTopology};
use tokio::sync::mpsc::UnboundedSender;

use super::{DockView, PlatformError, ViewId, ViewRequest, WindowPlatform};
use crate::application::events::ShellEvent;

/// Observable state of one mock view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockViewState {
    pub view_id: ViewId,
    pub definition: Option<EntityId>,
    pub screen_name: String,
    pub edge: Edge,
    pub bypass_compositor: bool,
    pub shown: bool,
    pub signals_connected: bool,
    pub forced_on_primary: bool,
    pub reverify_count: u32,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
struct PlatformLog {
    topology: ScreenTopology,
    views: BTreeMap<ViewId, Arc<Mutex<MockViewState>>>,
    created: Vec<ViewRequest>,
    destroyed: Vec<ViewId>,
    fail_creates: bool,
    notifier: Option<UnboundedSender<ShellEvent>>,
}

/// A mock implementation of [`WindowPlatform`].
#[derive(Debug, Clone, Default)]
pub struct MockWindowPlatform {
    log: Arc<Mutex<PlatformLog>>,
}

impl MockWindowPlatform {
    /// Creates a mock platform with the given screens attached.
    pub fn new(topology: ScreenTopology) -> Self {
        let platform = Self::default();
        platform.set_topology(topology);
        platform
    }

    /// Replaces the attached screens.
    pub fn set_topology(&self, topology: ScreenTopology) {
        self.log.lock().expect("lock poisoned").topology = topology;
    }

    /// Makes every following `create_view` call fail (or succeed again).
    pub fn set_fail_creates(&self, fail: bool) {
        self.log.lock().expect("lock poisoned").fail_creates = fail;
    }

    /// Posts `ShellEvent::ViewDestroyed` to `notifier` whenever a view is
    /// destroyed, the way a real platform reports deferred destruction.
    pub fn set_notifier(&self, notifier: UnboundedSender<ShellEvent>) {
        self.log.lock().expect("lock poisoned").notifier = Some(notifier);
    }

    /// Number of views created so far.
    pub fn created_count(&self) -> usize {
        self.log.lock().expect("lock poisoned").created.len()
    }

    /// Every request passed to `create_view`, in order.
    pub fn created_requests(&self) -> Vec<ViewRequest> {
        self.log.lock().expect("lock poisoned").created.clone()
    }

    /// Ids of every destroyed view, in order.
    pub fn destroyed_ids(&self) -> Vec<ViewId> {
        self.log.lock().expect("lock poisoned").destroyed.clone()
    }

    /// Snapshot of one view's state.
    pub fn view_state(&self, view_id: ViewId) -> Option<MockViewState> {
        let log = self.log.lock().expect("lock poisoned");
        let state = log.views.get(&view_id)?;
        let snapshot = state.lock().expect("lock poisoned").clone();
        Some(snapshot)
    }

    /// Snapshots of every view that has not been destroyed.
    pub fn live_views(&self) -> Vec<MockViewState> {
        let log = self.log.lock().expect("lock poisoned");
        log.views
            .values()
            .map(|state| state.lock().expect("lock poisoned").clone())
            .filter(|state| !state.destroyed)
            .collect()
    }

    /// The live view bound to `definition`, if any.
    pub fn live_view_for(&self, definition: EntityId) -> Option<MockViewState> {
        self.live_views()
            .into_iter()
            .find(|state| state.definition == Some(definition))
    }
}

impl WindowPlatform for MockWindowPlatform {
    fn topology(&self) -> ScreenTopology {
        self.log.lock().expect("lock poisoned").topology.clone()
    }

    fn create_view(&mut self, request: ViewRequest) -> Result<Box<dyn DockView>, PlatformError> {
        let mut log = self.log.lock().expect("lock poisoned");
        if log.fail_creates {
            return Err(PlatformError::CreateFailed(format!(
                "mock refused view for {}",
                request.definition
            )));
        }

        let state = Arc::new(Mutex::new(MockViewState {
            view_id: request.view_id,
            definition: None,
            screen_name: request.screen.name.clone(),
            edge: request.edge,
            bypass_compositor: request.bypass_compositor,
            shown: false,
            signals_connected: true,
            forced_on_primary: false,
            reverify_count: 0,
            destroyed: false,
        }));
        log.views.insert(request.view_id, Arc::clone(&state));
        log.created.push(request);
        Ok(Box::new(MockDockView { state }))
    }

    fn destroy_later(&mut self, view_id: ViewId, view: Box<dyn DockView>) {
        drop(view);
        let mut log = self.log.lock().expect("lock poisoned");
        if let Some(state) = log.views.get(&view_id) {
            state.lock().expect("lock poisoned").destroyed = true;
        }
        log.destroyed.push(view_id);
        if let Some(notifier) = &log.notifier {
            let _ = notifier.send(ShellEvent::ViewDestroyed(view_id));
        }
    }
}

/// A mock implementation of [`DockView`] backed by shared state.
#[derive(Debug)]
pub struct MockDockView {
    state: Arc<Mutex<MockViewState>>,
}

impl DockView for MockDockView {
    fn bind_definition(&mut self, definition: EntityId) {
        self.state.lock().expect("lock poisoned").definition = Some(definition);
    }

    fn show(&mut self) {
        self.state.lock().expect("lock poisoned").shown = true;
    }

    fn current_screen_name(&self) -> String {
        self.state.lock().expect("lock poisoned").screen_name.clone()
    }

    fn location(&self) -> Edge {
        self.state.lock().expect("lock poisoned").edge
    }

    fn reverify_screen(&mut self, target: &Screen) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.reverify_count += 1;
        if state.screen_name != target.name {
            state.screen_name = target.name.clone();
        }
    }

    fn disconnect_platform_signals(&mut self) {
        self.state.lock().expect("lock poisoned").signals_connected = false;
    }

    fn force_on_primary(&mut self) {
        self.state.lock().expect("lock poisoned").forced_on_primary = true;
    }
}
