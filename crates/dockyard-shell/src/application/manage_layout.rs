//! Layout controller: one loaded layout and everything attached to it.
//!
//! The controller owns the definition set, the view registry, the recreate
//! scheduler, the persistent store and the window platform.  The event loop
//! feeds it [`ShellEvent`]s through [`LayoutController::handle`], which
//! returns the follow-up events to post after a delay.
//!
//! Store failures inside `handle` are logged and do not stop the loop; the
//! in-memory state stays authoritative until the next successful write.

use std::path::Path;
use std::time::Duration;

use dockyard_core::domain::edges;
use dockyard_core::{
    check_integrity, DefinitionSet, DockDefinition, Edge, EntityId, IntegrityViolation,
    LeafDefinition, MemoryUsage,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::duplicate_layout::{
    commit, copy_placement, import_into_store, live_universe, plan_dock_copy, DuplicationError,
};
use crate::application::events::{Scheduled, ShellEvent};
use crate::application::manage_views::{ViewEntry, ViewRegistry};
use crate::application::recreate_view::{RecreateScheduler, RecreateStep};
use crate::application::sync_screens::{sync_views, SyncReport};
use crate::infrastructure::config_store::{ConfigStore, StoreError, TomlConfigStore};
use crate::infrastructure::platform::WindowPlatform;
use crate::infrastructure::storage::config::AppConfig;
use crate::infrastructure::storage::definitions::{
    delete_definition, load_definitions, read_definition, write_definition, DefinitionError,
};

/// Error type for layout-level operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Duplication(#[from] DuplicationError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Static settings of one loaded layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSettings {
    pub name: String,
    pub memory_usage: MemoryUsage,
    pub remove_delay: Duration,
    pub readd_delay: Duration,
}

impl LayoutSettings {
    /// Single-layout settings with the default recreate delays.
    pub fn new(name: impl Into<String>) -> Self {
        let defaults = AppConfig::default();
        Self {
            name: name.into(),
            memory_usage: MemoryUsage::Single,
            remove_delay: defaults.recreate.remove_delay(),
            readd_delay: defaults.recreate.readd_delay(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.shell.current_layout.clone(),
            memory_usage: config.shell.memory_usage,
            remove_delay: config.recreate.remove_delay(),
            readd_delay: config.recreate.readd_delay(),
        }
    }

    /// Layout name definitions are stamped with, in multi-layout mode only.
    pub fn owner(&self) -> Option<&str> {
        match self.memory_usage {
            MemoryUsage::Multiple => Some(&self.name),
            MemoryUsage::Single => None,
        }
    }
}

/// A dock on its way from one layout to another: its definitions (dock
/// first, then its trays) and its live view, if it had one.
#[derive(Debug)]
pub struct DockHandoff {
    pub definitions: Vec<DockDefinition>,
    pub view: Option<ViewEntry>,
}

impl DockHandoff {
    pub fn dock_id(&self) -> Option<EntityId> {
        self.definitions.first().map(|d| d.id)
    }
}

pub struct LayoutController {
    settings: LayoutSettings,
    definitions: DefinitionSet,
    registry: ViewRegistry,
    recreate: RecreateScheduler,
    store: Box<dyn ConfigStore>,
    platform: Box<dyn WindowPlatform>,
    block_automatic_view_creation: bool,
}

impl LayoutController {
    pub fn new(
        settings: LayoutSettings,
        store: Box<dyn ConfigStore>,
        platform: Box<dyn WindowPlatform>,
    ) -> Self {
        let recreate = RecreateScheduler::new(settings.remove_delay, settings.readd_delay);
        Self {
            settings,
            definitions: DefinitionSet::new(),
            registry: ViewRegistry::new(),
            recreate,
            store,
            platform,
            block_automatic_view_creation: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Loads the layout's definitions and creates the initial views.
    ///
    /// A layout with duplicate or colliding identifiers is still loaded; the
    /// violation is logged.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Store`] if loading or healing the store fails.
    pub fn init(&mut self) -> Result<SyncReport, LayoutError> {
        self.definitions = load_definitions(&mut *self.store, self.settings.owner())?;
        self.store.sync()?;
        if let Err(violation) = check_integrity(&self.definitions) {
            error!("layout {} is inconsistent: {violation}", self.settings.name);
        }

        self.registry.init();
        info!(
            "layout {} loaded with {} containers",
            self.settings.name,
            self.definitions.len()
        );

        if self.block_automatic_view_creation {
            return Ok(SyncReport::default());
        }
        Ok(self.sync_screens())
    }

    /// Destroys every view and drops all pending recreations.
    pub fn teardown(&mut self) {
        self.registry.teardown(&mut *self.platform);
        self.recreate =
            RecreateScheduler::new(self.settings.remove_delay, self.settings.readd_delay);
        info!("layout {} torn down", self.settings.name);
    }

    // ── Event handling ────────────────────────────────────────────────────────

    /// Applies one event and returns the events to post later.
    pub fn handle(&mut self, event: ShellEvent) -> Vec<Scheduled> {
        debug!("layout {} handling {event:?}", self.settings.name);
        match event {
            ShellEvent::ScreensChanged => {
                self.sync_screens();
                Vec::new()
            }
            ShellEvent::DestroyedChanged {
                definition,
                destroyed,
            } => {
                self.destroyed_changed(definition, destroyed);
                Vec::new()
            }
            ShellEvent::DefinitionAdded(def) => {
                self.add_definition(def);
                Vec::new()
            }
            ShellEvent::DefinitionRemoved(id) => {
                self.remove_definition(id);
                Vec::new()
            }
            ShellEvent::LeafAdded { container, leaf } => {
                self.leaf_added(container, leaf);
                Vec::new()
            }
            ShellEvent::ViewDestroyed(view) => {
                self.recreate.view_destroyed(view).into_iter().collect()
            }
            ShellEvent::RecreateRequested(id) => self.recreate(id),
            ShellEvent::Recreate(step) => self.run_recreate_step(step),
            ShellEvent::Shutdown => {
                self.teardown();
                Vec::new()
            }
        }
    }

    /// Runs the screen synchronizer against the platform's current screens.
    pub fn sync_screens(&mut self) -> SyncReport {
        let topology = self.platform.topology();
        sync_views(
            &mut self.registry,
            &self.definitions,
            &topology,
            &mut *self.platform,
        )
    }

    fn destroyed_changed(&mut self, definition: EntityId, destroyed: bool) {
        if destroyed {
            self.registry.move_to_waiting(definition);
            return;
        }
        if !self.registry.move_back_to_active(definition) && !self.block_automatic_view_creation {
            self.sync_screens();
        }
    }

    fn add_definition(&mut self, mut def: DockDefinition) {
        let id = def.id;
        if let Some(owner) = self.settings.owner() {
            def.layout_owner = Some(owner.to_string());
        }
        if let Err(e) = write_definition(&mut *self.store, &def).and_then(|()| self.store.sync()) {
            error!("could not persist container {id}: {e}");
        }
        self.definitions.insert(def);
        if !self.block_automatic_view_creation {
            self.sync_screens();
        }
    }

    fn remove_definition(&mut self, id: EntityId) {
        if self.definitions.remove(id).is_none() {
            debug!("container {id} is not part of layout {}", self.settings.name);
            return;
        }
        self.recreate.cancel(id);
        self.registry.remove(id, &mut *self.platform);
        if let Err(e) = delete_definition(&mut *self.store, id).and_then(|()| self.store.sync()) {
            error!("could not delete container {id}: {e}");
        }
        // The freed edge may let a rejected dock in.
        if !self.block_automatic_view_creation {
            self.sync_screens();
        }
    }

    fn leaf_added(&mut self, container: EntityId, leaf: LeafDefinition) {
        let tray = leaf.tray_container;
        let Some(def) = self.definitions.get_mut(container) else {
            debug!("container {container} is not part of layout {}", self.settings.name);
            return;
        };
        def.leaves.retain(|existing| existing.id != leaf.id);
        def.leaves.push(leaf);
        let def = def.clone();
        if let Err(e) = write_definition(&mut *self.store, &def).and_then(|()| self.store.sync()) {
            error!("could not persist container {container}: {e}");
        }

        if let Some(tray) = tray {
            if let Err(e) = self.adopt_tray(tray) {
                error!("could not adopt tray container {tray}: {e}");
            }
        }
    }

    /// Stamps tray container `tray` with this layout's name and adds it to
    /// the definition set.  Only multi-layout mode leaves trays orphaned, so
    /// this is a no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Definition`] if the tray is not in the store
    /// and [`LayoutError::Store`] if persisting it fails.
    pub fn adopt_tray(&mut self, tray: EntityId) -> Result<(), LayoutError> {
        let Some(owner) = self.settings.owner() else {
            return Ok(());
        };
        let mut def = match self.definitions.get(tray) {
            Some(def) if def.layout_owner.as_deref() == Some(owner) => return Ok(()),
            Some(def) => def.clone(),
            None => read_definition(&*self.store, tray)?,
        };
        def.layout_owner = Some(owner.to_string());
        write_definition(&mut *self.store, &def)?;
        self.store.sync()?;
        info!("tray container {tray} adopted by layout {}", self.settings.name);
        self.definitions.insert(def);
        Ok(())
    }

    // ── Recreation ────────────────────────────────────────────────────────────

    /// Starts the two-phase recreation of `definition`'s view.
    pub fn recreate(&mut self, definition: EntityId) -> Vec<Scheduled> {
        if !self.definitions.contains(definition) {
            warn!("cannot recreate unknown container {definition}");
            return Vec::new();
        }
        self.recreate.request(definition).into_iter().collect()
    }

    fn run_recreate_step(&mut self, step: RecreateStep) -> Vec<Scheduled> {
        if !self.recreate.accepts(step) {
            debug!("dropping stale {step:?}");
            return Vec::new();
        }
        let definition = step.definition();
        if !self.definitions.contains(definition) {
            self.recreate.cancel(definition);
            return Vec::new();
        }

        match step {
            RecreateStep::RemoveOld { .. } => {
                let old = self.registry.view_id(definition);
                self.registry.remove(definition, &mut *self.platform);
                self.recreate.removed(definition, old).into_iter().collect()
            }
            RecreateStep::AddBack { .. } => {
                self.recreate.finish(step);
                if !self.registry.contains(definition) {
                    self.sync_screens();
                }
                Vec::new()
            }
        }
    }

    // ── Duplication and import ────────────────────────────────────────────────

    /// Copies dock `source` (and its trays) and returns the copy's id.
    ///
    /// # Errors
    ///
    /// See [`DuplicationError`].  Nothing is written if identifiers run out.
    pub fn copy_dock(&mut self, source: EntityId) -> Result<EntityId, DuplicationError> {
        let def = self
            .definitions
            .get(source)
            .ok_or(DuplicationError::UnknownSource(source))?;
        let topology = self.platform.topology();
        let source_screen = self.registry.get(source).map(|e| e.view.current_screen_name());
        let placed = self.registry.placed_views();
        let placement = copy_placement(def, source_screen.as_deref(), &topology, &placed);

        let universe = live_universe(&self.definitions, &*self.store);
        let plan = plan_dock_copy(
            source,
            &self.definitions,
            &universe,
            placement,
            self.settings.owner(),
        )?;
        let copy_id = plan
            .table
            .get(source)
            .ok_or(DuplicationError::UnknownSource(source))?;
        commit(&plan, &mut *self.store)?;

        for def in plan.definitions {
            self.definitions.insert(def);
        }
        info!("copied dock {source} to {copy_id}");
        if !self.block_automatic_view_creation {
            self.sync_screens();
        }
        Ok(copy_id)
    }

    /// Imports a foreign definition set and returns the new container ids.
    ///
    /// # Errors
    ///
    /// See [`DuplicationError`].
    pub fn import_layout(
        &mut self,
        foreign: &DefinitionSet,
    ) -> Result<Vec<EntityId>, DuplicationError> {
        let plan = import_into_store(
            foreign,
            &self.definitions,
            &mut *self.store,
            self.settings.owner(),
        )?;
        let ids = plan.container_ids();
        for def in plan.definitions {
            self.definitions.insert(def);
        }
        info!("imported {} containers into layout {}", ids.len(), self.settings.name);
        if !self.block_automatic_view_creation {
            self.sync_screens();
        }
        Ok(ids)
    }

    /// Imports every container of the layout file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Store`] if the file cannot be read and
    /// [`LayoutError::Duplication`] if the import fails.
    pub fn import_layout_file(&mut self, path: &Path) -> Result<Vec<EntityId>, LayoutError> {
        let mut file = TomlConfigStore::open(path)?;
        let foreign = load_definitions(&mut file, None)?;
        Ok(self.import_layout(&foreign)?)
    }

    /// Writes every definition to `target`, e.g. to save the layout as a
    /// standalone file.  With `clear_owner` the layout stamps are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a write or the sync fails.
    pub fn export_to(
        &self,
        target: &mut dyn ConfigStore,
        clear_owner: bool,
    ) -> Result<(), StoreError> {
        for def in self.definitions.iter() {
            if clear_owner && def.layout_owner.is_some() {
                let mut def = def.clone();
                def.layout_owner = None;
                write_definition(target, &def)?;
            } else {
                write_definition(target, def)?;
            }
        }
        target.sync()
    }

    /// Renames the layout.  In multi-layout mode every definition is
    /// re-stamped with the new name, in memory and in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a write or the sync fails.  The new name is
    /// kept either way so the next successful write uses it.
    pub fn rename(&mut self, new_name: impl Into<String>) -> Result<(), StoreError> {
        let new_name = new_name.into();
        if new_name == self.settings.name {
            return Ok(());
        }
        info!("layout {} renamed to {new_name}", self.settings.name);
        self.settings.name = new_name;

        let Some(owner) = self.settings.owner().map(str::to_string) else {
            return Ok(());
        };
        let ids: Vec<EntityId> = self.definitions.container_ids().collect();
        for id in ids {
            if let Some(def) = self.definitions.get_mut(id) {
                def.layout_owner = Some(owner.clone());
                write_definition(&mut *self.store, def)?;
            }
        }
        self.store.sync()
    }

    // ── Moving docks between layouts ──────────────────────────────────────────

    /// Detaches dock `id` and its trays from this layout without destroying
    /// the view.  Returns `None` if the dock is not part of the layout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if deleting the stored records fails; the
    /// layout is unchanged in that case.
    pub fn unassign_dock(&mut self, id: EntityId) -> Result<Option<DockHandoff>, StoreError> {
        let Some(dock) = self.definitions.get(id) else {
            return Ok(None);
        };
        let mut ids = vec![id];
        ids.extend(
            dock.tray_containers()
                .filter(|tray| self.definitions.contains(*tray)),
        );

        for container in &ids {
            delete_definition(&mut *self.store, *container)?;
        }
        self.store.sync()?;

        let definitions = ids
            .into_iter()
            .filter_map(|container| self.definitions.remove(container))
            .collect();
        self.recreate.cancel(id);
        let view = self.registry.take(id);
        info!("dock {id} left layout {}", self.settings.name);
        Ok(Some(DockHandoff { definitions, view }))
    }

    /// Adopts a dock detached from another layout, keeping its view alive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if persisting the definitions fails.
    pub fn assign_dock(&mut self, handoff: DockHandoff) -> Result<(), StoreError> {
        let owner = self.settings.owner().map(str::to_string);
        for mut def in handoff.definitions {
            def.layout_owner = owner.clone();
            write_definition(&mut *self.store, &def)?;
            self.definitions.insert(def);
        }
        self.store.sync()?;

        if let Some(entry) = handoff.view {
            if let Err(entry) = self.registry.insert(entry) {
                warn!(
                    "dock {} already has a view here, dropping the incoming one",
                    entry.definition
                );
                ViewRegistry::destroy(entry, &mut *self.platform);
            }
        }
        if !self.block_automatic_view_creation {
            self.sync_screens();
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Edges of `screen_name` free of any active view.
    pub fn free_edges(&self, screen_name: &str) -> Vec<Edge> {
        edges::free_edges(screen_name, &self.registry.placed_views())
    }

    /// Edges the view of `definition` could move to on its current screen.
    /// Empty when the definition has no active view.
    pub fn available_edges_for_view(&self, definition: EntityId) -> Vec<Edge> {
        let Some(entry) = self.registry.get(definition) else {
            return Vec::new();
        };
        if self.registry.is_waiting(definition) {
            return Vec::new();
        }
        let screen = entry.view.current_screen_name();
        edges::available_edges_for_view(&screen, &self.registry.placed_views(), definition)
    }

    pub fn views_count(&self) -> usize {
        self.registry.views_count()
    }

    pub fn views_count_on(&self, screen_name: &str) -> usize {
        self.registry.views_count_on(screen_name)
    }

    pub fn subscribe_views_count(&self) -> watch::Receiver<usize> {
        self.registry.subscribe_views_count()
    }

    pub fn integrity_report(&self) -> Result<(), IntegrityViolation> {
        check_integrity(&self.definitions)
    }

    /// While set, new definitions and undo operations do not create views
    /// until the next screen sync.  Clearing it runs one.
    pub fn set_block_automatic_view_creation(&mut self, block: bool) {
        let was_blocked = std::mem::replace(&mut self.block_automatic_view_creation, block);
        if was_blocked && !block {
            self.sync_screens();
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn definitions(&self) -> &DefinitionSet {
        &self.definitions
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::mock::MockWindowPlatform;
    use crate::infrastructure::storage::definitions::write_definitions;
    use dockyard_core::domain::definition::TRAY_PLUGIN;
    use dockyard_core::{LeafDefinition, Screen, ScreenAffinity, ScreenTopology};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn laptop() -> ScreenTopology {
        ScreenTopology::new(vec![Screen::new("eDP-1", 1, true)])
    }

    fn laptop_with_hdmi() -> ScreenTopology {
        ScreenTopology::new(vec![
            Screen::new("eDP-1", 1, true),
            Screen::new("HDMI-1", 2, false),
        ])
    }

    fn store_with(defs: Vec<DockDefinition>) -> TomlConfigStore {
        let mut store = TomlConfigStore::in_memory();
        write_definitions(&mut store, &DefinitionSet::from_definitions(defs)).unwrap();
        store
    }

    fn controller(
        defs: Vec<DockDefinition>,
        topology: ScreenTopology,
    ) -> (LayoutController, MockWindowPlatform) {
        let platform = MockWindowPlatform::new(topology);
        let mut controller = LayoutController::new(
            LayoutSettings::new("default"),
            Box::new(store_with(defs)),
            Box::new(platform.clone()),
        );
        controller.init().unwrap();
        (controller, platform)
    }

    fn exported(controller: &LayoutController) -> DefinitionSet {
        let mut target = TomlConfigStore::in_memory();
        controller.export_to(&mut target, false).unwrap();
        load_definitions(&mut target, None).unwrap()
    }

    fn step_of(scheduled: &[Scheduled]) -> ShellEvent {
        assert_eq!(scheduled.len(), 1, "expected one follow-up, got {scheduled:?}");
        scheduled[0].event.clone()
    }

    fn owned(mut def: DockDefinition, owner: &str) -> DockDefinition {
        def.layout_owner = Some(owner.into());
        def
    }

    /// A layout file in a fresh temp dir holding `defs`, so the store can be
    /// reopened after the controller has written to it.
    fn layout_file_with(defs: Vec<DockDefinition>) -> (std::path::PathBuf, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("dockyard-layout-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("work.layout.toml");
        let mut store = TomlConfigStore::open(&path).unwrap();
        write_definitions(&mut store, &DefinitionSet::from_definitions(defs)).unwrap();
        store.sync().unwrap();
        (dir, path)
    }

    fn multi_controller_at(path: &std::path::Path, name: &str) -> LayoutController {
        let settings = LayoutSettings {
            memory_usage: MemoryUsage::Multiple,
            ..LayoutSettings::new(name)
        };
        let mut controller = LayoutController::new(
            settings,
            Box::new(TomlConfigStore::open(path).unwrap()),
            Box::new(MockWindowPlatform::new(laptop())),
        );
        controller.init().unwrap();
        controller
    }

    fn reload(path: &std::path::Path, owner: &str) -> DefinitionSet {
        load_definitions(&mut TomlConfigStore::open(path).unwrap(), Some(owner)).unwrap()
    }

    fn dock_with_tray() -> Vec<DockDefinition> {
        let mut dock = DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom);
        dock.leaves
            .push(LeafDefinition::new(EntityId(40), "org.tray-applet").with_tray(EntityId(13)));
        vec![dock, DockDefinition::new(EntityId(13), TRAY_PLUGIN)]
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    #[test]
    fn test_init_loads_definitions_and_creates_views() {
        let (controller, platform) = controller(
            vec![
                DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
                DockDefinition::dock(13, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Top),
            ],
            laptop_with_hdmi(),
        );

        assert_eq!(controller.definitions().len(), 2);
        assert_eq!(controller.views_count(), 2);
        assert_eq!(controller.views_count_on("HDMI-1"), 1);
        assert_eq!(platform.created_count(), 2);
    }

    #[test]
    fn test_init_keeps_inconsistent_layout_loaded() {
        let mut dock = DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom);
        dock.leaves.push(LeafDefinition::new(EntityId(13), "org.clock"));
        let (controller, _) = controller(
            vec![dock, DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Top)],
            laptop(),
        );

        assert_eq!(controller.definitions().len(), 2);
        let violation = controller.integrity_report().unwrap_err();
        assert!(violation.container_leaf_collisions.contains(&EntityId(13)));
    }

    #[test]
    fn test_init_with_blocked_creation_creates_nothing_until_unblocked() {
        let platform = MockWindowPlatform::new(laptop());
        let mut controller = LayoutController::new(
            LayoutSettings::new("default"),
            Box::new(store_with(vec![DockDefinition::dock(
                12,
                ScreenAffinity::OnPrimary,
                Edge::Bottom,
            )])),
            Box::new(platform.clone()),
        );
        controller.set_block_automatic_view_creation(true);

        let report = controller.init().unwrap();
        assert!(report.is_noop());
        assert_eq!(platform.created_count(), 0);

        controller.set_block_automatic_view_creation(false);
        assert_eq!(controller.views_count(), 1);
    }

    #[test]
    fn test_multi_layout_controller_sees_only_its_own_definitions() {
        let mut ours = DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom);
        ours.layout_owner = Some("work".into());
        let mut theirs = DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Top);
        theirs.layout_owner = Some("home".into());
        let settings = LayoutSettings {
            memory_usage: MemoryUsage::Multiple,
            ..LayoutSettings::new("work")
        };
        let mut controller = LayoutController::new(
            settings,
            Box::new(store_with(vec![ours, theirs])),
            Box::new(MockWindowPlatform::new(laptop())),
        );

        controller.init().unwrap();

        assert!(controller.definitions().contains(EntityId(12)));
        assert!(!controller.definitions().contains(EntityId(13)));
    }

    #[test]
    fn test_shutdown_tears_down_every_view() {
        let (mut controller, platform) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );

        controller.handle(ShellEvent::Shutdown);

        assert_eq!(controller.views_count(), 0);
        assert!(platform.live_views().is_empty());
    }

    // ── Definition events ─────────────────────────────────────────────────────

    #[test]
    fn test_destroyed_definition_moves_view_to_waiting_and_back() {
        let (mut controller, platform) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );

        controller.handle(ShellEvent::DestroyedChanged {
            definition: EntityId(12),
            destroyed: true,
        });
        assert_eq!(controller.views_count(), 0);
        assert!(controller.registry().is_waiting(EntityId(12)));

        controller.handle(ShellEvent::DestroyedChanged {
            definition: EntityId(12),
            destroyed: false,
        });
        assert_eq!(controller.views_count(), 1);
        assert_eq!(platform.created_count(), 1);
    }

    #[test]
    fn test_added_definition_is_persisted_and_gets_a_view() {
        let (mut controller, platform) = controller(Vec::new(), laptop());

        controller.handle(ShellEvent::DefinitionAdded(DockDefinition::dock(
            12,
            ScreenAffinity::OnPrimary,
            Edge::Left,
        )));

        assert_eq!(controller.views_count(), 1);
        assert_eq!(platform.live_view_for(EntityId(12)).unwrap().edge, Edge::Left);
        assert!(exported(&controller).contains(EntityId(12)));
    }

    #[test]
    fn test_removed_definition_frees_edge_for_rejected_dock() {
        // Arrange: 13 collides with 12 on the bottom edge.
        let (mut controller, _) = controller(
            vec![
                DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
                DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Bottom),
            ],
            laptop(),
        );
        assert!(!controller.registry().contains(EntityId(13)));

        // Act
        controller.handle(ShellEvent::DefinitionRemoved(EntityId(12)));

        // Assert
        assert!(controller.registry().contains(EntityId(13)));
        assert!(!exported(&controller).contains(EntityId(12)));
    }

    #[test]
    fn test_screen_attach_creates_pending_explicit_dock() {
        let (mut controller, platform) = controller(
            vec![DockDefinition::dock(
                12,
                ScreenAffinity::Explicit("HDMI-1".into()),
                Edge::Top,
            )],
            laptop(),
        );
        assert_eq!(controller.views_count(), 0);

        platform.set_topology(laptop_with_hdmi());
        controller.handle(ShellEvent::ScreensChanged);

        assert_eq!(controller.views_count_on("HDMI-1"), 1);
    }

    // ── Recreation ────────────────────────────────────────────────────────────

    #[test]
    fn test_recreate_replaces_the_view_after_old_one_is_destroyed() {
        // Arrange
        let (mut controller, platform) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );
        let old = controller.registry().view_id(EntityId(12)).unwrap();

        // Act
        let remove = step_of(&controller.handle(ShellEvent::RecreateRequested(EntityId(12))));
        assert!(controller.handle(remove).is_empty());
        let add_back = step_of(&controller.handle(ShellEvent::ViewDestroyed(old)));
        controller.handle(add_back);

        // Assert
        let new = controller.registry().view_id(EntityId(12)).unwrap();
        assert_ne!(old, new);
        assert_eq!(platform.destroyed_ids(), vec![old]);
        assert_eq!(platform.created_count(), 2);
    }

    #[test]
    fn test_repeated_recreate_requests_are_coalesced() {
        let (mut controller, _) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );

        assert_eq!(controller.handle(ShellEvent::RecreateRequested(EntityId(12))).len(), 1);
        assert!(controller.handle(ShellEvent::RecreateRequested(EntityId(12))).is_empty());
    }

    #[test]
    fn test_recreate_step_after_definition_removal_is_dropped() {
        let (mut controller, platform) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );
        let remove = step_of(&controller.handle(ShellEvent::RecreateRequested(EntityId(12))));
        controller.handle(ShellEvent::DefinitionRemoved(EntityId(12)));

        assert!(controller.handle(remove).is_empty());
        assert_eq!(platform.created_count(), 1);
    }

    #[test]
    fn test_recreate_of_unknown_definition_schedules_nothing() {
        let (mut controller, _) = controller(Vec::new(), laptop());
        assert!(controller.recreate(EntityId(99)).is_empty());
    }

    // ── Duplication and import ────────────────────────────────────────────────

    #[test]
    fn test_copy_dock_lands_on_the_other_screen() {
        let (mut controller, platform) = controller(dock_with_tray(), laptop_with_hdmi());

        let copy = controller.copy_dock(EntityId(12)).unwrap();

        let def = controller.definitions().get(copy).unwrap();
        assert_eq!(def.explicit_screen(), Some("HDMI-1"));
        assert_eq!(def.edge, Edge::Bottom);
        assert_eq!(platform.live_view_for(copy).unwrap().screen_name, "HDMI-1");
        let trays: Vec<EntityId> = def.tray_containers().collect();
        assert_eq!(trays.len(), 1);
        assert_ne!(trays[0], EntityId(13));
        assert!(controller.definitions().contains(trays[0]));
        assert!(exported(&controller).contains(copy));
    }

    #[test]
    fn test_copy_of_unknown_dock_fails() {
        let (mut controller, _) = controller(Vec::new(), laptop());
        assert!(matches!(
            controller.copy_dock(EntityId(12)),
            Err(DuplicationError::UnknownSource(EntityId(12)))
        ));
    }

    #[test]
    fn test_import_layout_renumbers_and_creates_views() {
        let (mut controller, _) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );
        let foreign = DefinitionSet::from_definitions(vec![DockDefinition::dock(
            12,
            ScreenAffinity::OnPrimary,
            Edge::Top,
        )]);

        let ids = controller.import_layout(&foreign).unwrap();

        assert_eq!(ids, vec![EntityId(13)]);
        assert_eq!(controller.views_count(), 2);
        assert!(controller.integrity_report().is_ok());
    }

    #[test]
    fn test_export_can_clear_layout_owner() {
        let settings = LayoutSettings {
            memory_usage: MemoryUsage::Multiple,
            ..LayoutSettings::new("work")
        };
        let mut controller = LayoutController::new(
            settings,
            Box::new(TomlConfigStore::in_memory()),
            Box::new(MockWindowPlatform::new(laptop())),
        );
        controller.init().unwrap();
        controller.handle(ShellEvent::DefinitionAdded({
            let mut def = DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom);
            def.layout_owner = Some("work".into());
            def
        }));

        let mut target = TomlConfigStore::in_memory();
        controller.export_to(&mut target, true).unwrap();
        let saved = load_definitions(&mut target, None).unwrap();

        assert_eq!(saved.get(EntityId(12)).unwrap().layout_owner, None);
    }

    // ── Renaming and tray adoption ────────────────────────────────────────────

    #[test]
    fn test_rename_in_multi_layout_mode_restamps_every_owner() {
        // Arrange
        let (dir, path) = layout_file_with(vec![
            owned(DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom), "work"),
            owned(DockDefinition::dock(14, ScreenAffinity::OnPrimary, Edge::Top), "work"),
        ]);
        let mut controller = multi_controller_at(&path, "work");

        // Act
        controller.rename("office").unwrap();

        // Assert: memory and store agree on the new owner.
        assert_eq!(controller.name(), "office");
        assert!(controller
            .definitions()
            .iter()
            .all(|def| def.layout_owner.as_deref() == Some("office")));
        assert_eq!(reload(&path, "office").len(), 2);
        assert!(reload(&path, "work").is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rename_in_single_layout_mode_leaves_owners_alone() {
        let (mut controller, _) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );

        controller.rename("office").unwrap();

        assert_eq!(controller.name(), "office");
        assert_eq!(exported(&controller).get(EntityId(12)).unwrap().layout_owner, None);
    }

    #[test]
    fn test_leaf_with_tray_adopts_the_orphaned_tray_in_multi_layout_mode() {
        // Arrange: tray 13 is in the store but owned by no layout.
        let (dir, path) = layout_file_with(vec![
            owned(DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom), "work"),
            DockDefinition::new(EntityId(13), TRAY_PLUGIN),
        ]);
        let mut controller = multi_controller_at(&path, "work");
        assert!(!controller.definitions().contains(EntityId(13)));

        // Act
        controller.handle(ShellEvent::LeafAdded {
            container: EntityId(12),
            leaf: LeafDefinition::new(EntityId(40), "org.tray-applet").with_tray(EntityId(13)),
        });

        // Assert
        let tray = controller.definitions().get(EntityId(13)).unwrap();
        assert_eq!(tray.layout_owner.as_deref(), Some("work"));
        let saved = reload(&path, "work");
        assert!(saved.contains(EntityId(13)));
        assert_eq!(saved.get(EntityId(12)).unwrap().tray_container(), Some(EntityId(13)));
        assert!(controller.integrity_report().is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_leaf_with_tray_in_single_layout_mode_only_records_the_leaf() {
        let (mut controller, _) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );

        controller.handle(ShellEvent::LeafAdded {
            container: EntityId(12),
            leaf: LeafDefinition::new(EntityId(40), "org.tray-applet").with_tray(EntityId(13)),
        });

        let dock = exported(&controller).get(EntityId(12)).cloned().unwrap();
        assert_eq!(dock.leaf_ids().collect::<Vec<_>>(), vec![EntityId(40)]);
        assert_eq!(dock.layout_owner, None);
    }

    #[test]
    fn test_leaf_for_a_container_outside_the_layout_is_ignored() {
        let (mut controller, _) = controller(Vec::new(), laptop());

        controller.handle(ShellEvent::LeafAdded {
            container: EntityId(12),
            leaf: LeafDefinition::new(EntityId(40), "org.clock"),
        });

        assert!(controller.definitions().is_empty());
    }

    // ── Moving docks ──────────────────────────────────────────────────────────

    #[test]
    fn test_dock_moves_between_layouts_with_its_view() {
        // Arrange
        let (mut from, platform) = controller(dock_with_tray(), laptop());
        let mut to = LayoutController::new(
            LayoutSettings::new("other"),
            Box::new(TomlConfigStore::in_memory()),
            Box::new(platform.clone()),
        );
        to.init().unwrap();
        let view = from.registry().view_id(EntityId(12)).unwrap();

        // Act
        let handoff = from.unassign_dock(EntityId(12)).unwrap().unwrap();
        assert_eq!(handoff.dock_id(), Some(EntityId(12)));
        to.assign_dock(handoff).unwrap();

        // Assert
        assert!(from.definitions().is_empty());
        assert_eq!(from.views_count(), 0);
        assert_eq!(to.definitions().len(), 2);
        assert_eq!(to.registry().view_id(EntityId(12)), Some(view));
        assert!(platform.destroyed_ids().is_empty());
    }

    #[test]
    fn test_unassign_unknown_dock_is_none() {
        let (mut controller, _) = controller(Vec::new(), laptop());
        assert!(controller.unassign_dock(EntityId(12)).unwrap().is_none());
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    #[test]
    fn test_edge_queries_reflect_active_views() {
        let (controller, _) = controller(
            vec![
                DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
                DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Left),
            ],
            laptop(),
        );

        assert_eq!(controller.free_edges("eDP-1"), vec![Edge::Top, Edge::Right]);
        assert_eq!(
            controller.available_edges_for_view(EntityId(12)),
            vec![Edge::Bottom, Edge::Top, Edge::Right]
        );
        assert!(controller.available_edges_for_view(EntityId(99)).is_empty());
    }

    #[test]
    fn test_views_count_subscription_sees_changes() {
        let (mut controller, _) = controller(
            vec![DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
            laptop(),
        );
        let rx = controller.subscribe_views_count();
        assert_eq!(*rx.borrow(), 1);

        controller.handle(ShellEvent::DefinitionRemoved(EntityId(12)));

        assert_eq!(*rx.borrow(), 0);
    }
}
