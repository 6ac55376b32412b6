//! View registry: the live dock views of one layout.
//!
//! The registry owns every [`DockView`] and keeps them in two partitions:
//!
//! - **active**: views of definitions that are alive.
//! - **waiting**: views of definitions in the destroyed (undo-able) state.
//!   They stay alive so an undo can bring them back instantly, but they no
//!   longer count towards edge occupancy or the published view count.
//!
//! A view moves between partitions atomically; it is never in both.
//!
//! # Placement rules enforced by `add`
//!
//! 1. One view per definition, across both partitions.
//! 2. One view per edge per screen.
//! 3. A primary-affinity dock beats an explicit-affinity dock for an edge of
//!    the primary screen.  The explicit dock is rejected if it arrives second
//!    and torn down if it was there first.

use std::collections::BTreeMap;

use dockyard_core::domain::edges::{edge_occupied_by_primary_dock, free_edges};
use dockyard_core::{DefinitionSet, DockDefinition, Edge, EntityId, PlacedView, ScreenTopology};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::infrastructure::platform::{DockView, PlatformError, ViewId, ViewRequest, WindowPlatform};

/// Reasons a view could not be placed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// The definition has no plugin and cannot be instantiated.
    #[error("definition {0} cannot be instantiated")]
    InvalidDefinition(EntityId),

    /// The definition already has a view, active or waiting.
    #[error("definition {0} already has a view")]
    AlreadyPresent(EntityId),

    /// The requested screen is not attached.
    #[error("screen {screen:?} for definition {definition} is not attached")]
    ScreenUnavailable { definition: EntityId, screen: String },

    /// Another dock already holds, or has precedence for, the edge.
    #[error("edge {edge} of screen {screen:?} is not available to definition {definition}")]
    EdgeConflict {
        definition: EntityId,
        screen: String,
        edge: Edge,
    },

    /// The platform refused to create the view.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// What `add` needs to know about the rest of the layout.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub definitions: &'a DefinitionSet,
    pub topology: &'a ScreenTopology,
}

/// Per-call overrides for `add`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Place on the primary screen whatever the definition's affinity says.
    pub force_primary: bool,
    /// Place on this screen instead of the definition's own.
    pub explicit_screen: Option<String>,
}

impl AddOptions {
    pub fn on_screen(name: impl Into<String>) -> Self {
        Self {
            force_primary: false,
            explicit_screen: Some(name.into()),
        }
    }

    pub fn forced_primary() -> Self {
        Self {
            force_primary: true,
            explicit_screen: None,
        }
    }
}

/// A live view together with the definition it renders.
pub struct ViewEntry {
    pub view_id: ViewId,
    pub definition: EntityId,
    pub view: Box<dyn DockView>,
}

impl ViewEntry {
    /// The view as seen by the edge resolver.
    pub fn placed(&self) -> PlacedView {
        PlacedView {
            definition: self.definition,
            screen_name: self.view.current_screen_name(),
            edge: self.view.location(),
        }
    }
}

impl std::fmt::Debug for ViewEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewEntry")
            .field("view_id", &self.view_id)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Owner of every live view of one layout.
pub struct ViewRegistry {
    active: BTreeMap<EntityId, ViewEntry>,
    waiting: BTreeMap<EntityId, ViewEntry>,
    count_tx: watch::Sender<usize>,
    initialised: bool,
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRegistry {
    pub fn new() -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            active: BTreeMap::new(),
            waiting: BTreeMap::new(),
            count_tx,
            initialised: false,
        }
    }

    /// Marks the registry ready and publishes the initial count.
    pub fn init(&mut self) {
        self.initialised = true;
        self.publish_count();
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Disconnects and destroys every view.  Waiting views go first.
    pub fn teardown(&mut self, platform: &mut dyn WindowPlatform) {
        let waiting = std::mem::take(&mut self.waiting);
        let active = std::mem::take(&mut self.active);
        for (_, entry) in waiting.into_iter().chain(active) {
            Self::destroy(entry, platform);
        }
        self.initialised = false;
        self.publish_count();
    }

    /// Creates, binds and shows a view for `def`.
    ///
    /// Returns `Ok(None)` for definitions that are not docks.
    ///
    /// # Errors
    ///
    /// See [`PlacementError`].  A rejected add has no side effects.
    pub fn add(
        &mut self,
        def: &DockDefinition,
        ctx: &PlacementContext<'_>,
        platform: &mut dyn WindowPlatform,
        options: AddOptions,
    ) -> Result<Option<ViewId>, PlacementError> {
        if !def.is_loadable() {
            warn!("definition {} has no plugin, refusing to create a view", def.id);
            return Err(PlacementError::InvalidDefinition(def.id));
        }
        if !def.is_dock() {
            return Ok(None);
        }
        if self.contains(def.id) {
            return Err(PlacementError::AlreadyPresent(def.id));
        }

        let on_primary =
            options.force_primary || (def.is_on_primary() && options.explicit_screen.is_none());

        let (screen, replaced) = if on_primary {
            let screen = ctx
                .topology
                .primary()
                .ok_or_else(|| PlacementError::ScreenUnavailable {
                    definition: def.id,
                    screen: "primary".to_string(),
                })?;
            let replaced = self.explicit_views_at(&screen.name, def.edge, ctx.definitions);
            (screen, replaced)
        } else {
            let name = options
                .explicit_screen
                .as_deref()
                .or(def.explicit_screen())
                .or(def.last_screen.as_deref())
                .unwrap_or_default();
            let screen = ctx
                .topology
                .by_name(name)
                .ok_or_else(|| PlacementError::ScreenUnavailable {
                    definition: def.id,
                    screen: name.to_string(),
                })?;
            if ctx.topology.is_primary(name)
                && edge_occupied_by_primary_dock(ctx.definitions, def.edge)
            {
                info!(
                    "rejecting dock {} on {name}: a primary dock claims {}",
                    def.id, def.edge
                );
                return Err(PlacementError::EdgeConflict {
                    definition: def.id,
                    screen: name.to_string(),
                    edge: def.edge,
                });
            }
            (screen, Vec::new())
        };

        let others: Vec<PlacedView> = self
            .active
            .values()
            .filter(|e| !replaced.contains(&e.definition))
            .map(ViewEntry::placed)
            .collect();
        if !free_edges(&screen.name, &others).contains(&def.edge) {
            debug!("edge {} of {} is taken, not placing dock {}", def.edge, screen.name, def.id);
            return Err(PlacementError::EdgeConflict {
                definition: def.id,
                screen: screen.name.clone(),
                edge: def.edge,
            });
        }

        for id in replaced {
            info!(
                "removing explicit dock {id} from {} {}: primary dock {} takes the edge",
                screen.name, def.edge, def.id
            );
            self.remove(id, platform);
        }

        let view_id = Uuid::new_v4();
        let mut view = platform.create_view(ViewRequest {
            view_id,
            definition: def.id,
            screen: screen.clone(),
            edge: def.edge,
            visibility: def.visibility,
            bypass_compositor: def.effective_bypass_compositor(),
        })?;
        view.bind_definition(def.id);
        if options.force_primary {
            view.force_on_primary();
        }
        view.show();

        info!("dock {} placed on {} at {}", def.id, screen.name, def.edge);
        self.active.insert(
            def.id,
            ViewEntry {
                view_id,
                definition: def.id,
                view,
            },
        );
        self.publish_count();
        Ok(Some(view_id))
    }

    /// Active views of explicit-affinity definitions sitting on `edge` of
    /// `screen_name`.
    fn explicit_views_at(
        &self,
        screen_name: &str,
        edge: Edge,
        definitions: &DefinitionSet,
    ) -> Vec<EntityId> {
        self.active
            .values()
            .filter(|e| {
                let placed = e.placed();
                placed.screen_name == screen_name
                    && placed.edge == edge
                    && definitions
                        .get(e.definition)
                        .is_some_and(|d| !d.is_on_primary())
            })
            .map(|e| e.definition)
            .collect()
    }

    /// Removes the view of `definition` from either partition and hands it to
    /// the platform for deferred destruction.  Returns `false` when there was
    /// no view.
    pub fn remove(&mut self, definition: EntityId, platform: &mut dyn WindowPlatform) -> bool {
        let Some(entry) = self.take(definition) else {
            return false;
        };
        Self::destroy(entry, platform);
        true
    }

    /// Disconnects a view that is no longer registered and hands it to the
    /// platform.
    pub fn destroy(mut entry: ViewEntry, platform: &mut dyn WindowPlatform) {
        debug!("destroying view {} of dock {}", entry.view_id, entry.definition);
        entry.view.disconnect_platform_signals();
        platform.destroy_later(entry.view_id, entry.view);
    }

    /// Moves an active view to the waiting partition.
    pub fn move_to_waiting(&mut self, definition: EntityId) -> bool {
        let Some(entry) = self.active.remove(&definition) else {
            return false;
        };
        self.waiting.insert(definition, entry);
        self.publish_count();
        true
    }

    /// Moves a waiting view back to the active partition.
    pub fn move_back_to_active(&mut self, definition: EntityId) -> bool {
        let Some(entry) = self.waiting.remove(&definition) else {
            return false;
        };
        self.active.insert(definition, entry);
        self.publish_count();
        true
    }

    /// Takes the view of `definition` out of the registry without destroying it.
    pub fn take(&mut self, definition: EntityId) -> Option<ViewEntry> {
        let entry = self
            .active
            .remove(&definition)
            .or_else(|| self.waiting.remove(&definition))?;
        self.publish_count();
        Some(entry)
    }

    /// Adopts a view taken from another registry.
    ///
    /// # Errors
    ///
    /// Hands the entry back when its definition already has a view here.
    pub fn insert(&mut self, entry: ViewEntry) -> Result<(), ViewEntry> {
        if self.contains(entry.definition) {
            return Err(entry);
        }
        self.active.insert(entry.definition, entry);
        self.publish_count();
        Ok(())
    }

    /// `true` if `definition` has a view in either partition.
    pub fn contains(&self, definition: EntityId) -> bool {
        self.active.contains_key(&definition) || self.waiting.contains_key(&definition)
    }

    pub fn is_waiting(&self, definition: EntityId) -> bool {
        self.waiting.contains_key(&definition)
    }

    pub fn view_id(&self, definition: EntityId) -> Option<ViewId> {
        self.active
            .get(&definition)
            .or_else(|| self.waiting.get(&definition))
            .map(|e| e.view_id)
    }

    pub fn get(&self, definition: EntityId) -> Option<&ViewEntry> {
        self.active
            .get(&definition)
            .or_else(|| self.waiting.get(&definition))
    }

    pub fn active_ids(&self) -> Vec<EntityId> {
        self.active.keys().copied().collect()
    }

    pub fn active_entries_mut(&mut self) -> impl Iterator<Item = &mut ViewEntry> {
        self.active.values_mut()
    }

    /// Number of active views.
    pub fn views_count(&self) -> usize {
        self.active.len()
    }

    /// Number of active views on `screen_name`.
    pub fn views_count_on(&self, screen_name: &str) -> usize {
        self.active
            .values()
            .filter(|e| e.view.current_screen_name() == screen_name)
            .count()
    }

    /// Active views as seen by the edge resolver.
    pub fn placed_views(&self) -> Vec<PlacedView> {
        self.active.values().map(ViewEntry::placed).collect()
    }

    /// Receiver that sees every change of the active view count.
    pub fn subscribe_views_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    fn publish_count(&self) {
        self.count_tx.send_replace(self.active.len());
    }
}
