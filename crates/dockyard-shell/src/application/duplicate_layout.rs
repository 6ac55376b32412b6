//! Duplication and import of dock definitions.
//!
//! Copying one dock and importing a whole layout file go through the same
//! pipeline:
//!
//! 1. Collect the live identifier universe: the layout's own definitions plus
//!    everything already in the store (other layouts share the same file in
//!    multi-layout mode).
//! 2. Plan and apply an identifier remap for the source definitions.
//! 3. Stamp the owning layout in multi-layout mode.
//! 4. Write the renumbered definitions and sync the store.
//!
//! Steps 1 to 3 never touch the store, so a plan that runs out of
//! identifiers leaves nothing behind.

use std::collections::BTreeSet;

use dockyard_core::domain::edges::free_edges;
use dockyard_core::{
    DefinitionSet, DockDefinition, Edge, EntityId, PlacedView, RemapError, RemapTable,
    ScreenAffinity, ScreenTopology,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::config_store::{ConfigStore, StoreError};
use crate::infrastructure::storage::definitions::{stored_ids, write_definitions};

/// Error type for duplication and import.
#[derive(Debug, Error)]
pub enum DuplicationError {
    /// The dock to copy does not exist.
    #[error("definition {0} does not exist")]
    UnknownSource(EntityId),

    /// The identifier space is exhausted.
    #[error(transparent)]
    Remap(#[from] RemapError),

    /// Writing the new definitions failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Renumbered definitions ready to be committed.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub table: RemapTable,
    pub definitions: DefinitionSet,
}

impl ImportPlan {
    /// New identifiers of every imported container, in insertion order.
    pub fn container_ids(&self) -> Vec<EntityId> {
        self.definitions.container_ids().collect()
    }
}

/// Every identifier that a new entity must avoid.
pub fn live_universe(definitions: &DefinitionSet, store: &dyn ConfigStore) -> BTreeSet<EntityId> {
    let mut universe = definitions.all_ids();
    universe.extend(stored_ids(store));
    universe
}

/// Where the copy of `source` should go.
///
/// With more than one screen attached the copy goes to the first other
/// screen whose edge matching the source is free.  Otherwise it stays on the
/// source's screen, on that screen's first free edge (`Bottom` when none is
/// free).  Either way the copy is pinned to its screen.
pub fn copy_placement(
    source: &DockDefinition,
    source_screen: Option<&str>,
    topology: &ScreenTopology,
    placed: &[PlacedView],
) -> (ScreenAffinity, Edge) {
    let screen = source_screen
        .or(source.requested_screen())
        .filter(|name| topology.contains(name))
        .or_else(|| topology.primary().map(|s| s.name.as_str()));
    let Some(screen) = screen else {
        return (source.affinity.clone(), source.edge);
    };

    if topology.len() > 1 {
        let other = topology
            .screens()
            .filter(|s| s.name != screen)
            .find(|s| free_edges(&s.name, placed).contains(&source.edge));
        if let Some(other) = other {
            return (ScreenAffinity::Explicit(other.name.clone()), source.edge);
        }
    }

    let edge = free_edges(screen, placed)
        .first()
        .copied()
        .unwrap_or(Edge::Bottom);
    (ScreenAffinity::Explicit(screen.to_string()), edge)
}

fn stamp_owner(set: DefinitionSet, owner: Option<&str>) -> DefinitionSet {
    let Some(owner) = owner else {
        return set;
    };
    DefinitionSet::from_definitions(
        set.into_iter()
            .map(|mut def| {
                def.layout_owner = Some(owner.to_string());
                def
            })
            .collect(),
    )
}

/// Plans a copy of dock `source_id` and the tray containers it references.
///
/// # Errors
///
/// Returns [`DuplicationError::UnknownSource`] if the dock does not exist and
/// [`DuplicationError::Remap`] if identifiers run out.
pub fn plan_dock_copy(
    source_id: EntityId,
    definitions: &DefinitionSet,
    universe: &BTreeSet<EntityId>,
    placement: (ScreenAffinity, Edge),
    owner: Option<&str>,
) -> Result<ImportPlan, DuplicationError> {
    let source = definitions
        .get(source_id)
        .ok_or(DuplicationError::UnknownSource(source_id))?;

    let mut subset = DefinitionSet::new();
    subset.insert(source.clone());
    for tray in definitions.trays_of(source_id) {
        subset.insert(tray.clone());
    }

    let table = RemapTable::plan(universe, &subset)?;
    let mut copy = table.apply(&subset);
    if let Some(dock) = table.get(source_id).and_then(|id| copy.get_mut(id)) {
        let (affinity, edge) = placement;
        dock.affinity = affinity;
        dock.edge = edge;
    }

    debug!("planned copy of dock {source_id}: {} containers", copy.len());
    Ok(ImportPlan {
        table,
        definitions: stamp_owner(copy, owner),
    })
}

/// Plans the import of a foreign definition set.
///
/// # Errors
///
/// Returns [`DuplicationError::Remap`] if identifiers run out.
pub fn plan_import(
    foreign: &DefinitionSet,
    universe: &BTreeSet<EntityId>,
    owner: Option<&str>,
) -> Result<ImportPlan, DuplicationError> {
    let table = RemapTable::plan(universe, foreign)?;
    let imported = table.apply(foreign);
    Ok(ImportPlan {
        table,
        definitions: stamp_owner(imported, owner),
    })
}

/// Writes a plan's definitions and syncs the store.
///
/// # Errors
///
/// Returns [`DuplicationError::Store`] if a write or the sync fails.
pub fn commit(plan: &ImportPlan, store: &mut dyn ConfigStore) -> Result<(), DuplicationError> {
    write_definitions(store, &plan.definitions)?;
    store.sync()?;
    info!("committed {} new containers", plan.definitions.len());
    Ok(())
}

/// Imports `foreign` next to `definitions`, writing the result to `store`.
///
/// # Errors
///
/// See [`plan_import`] and [`commit`].  Nothing is written when planning fails.
pub fn import_into_store(
    foreign: &DefinitionSet,
    definitions: &DefinitionSet,
    store: &mut dyn ConfigStore,
    owner: Option<&str>,
) -> Result<ImportPlan, DuplicationError> {
    let universe = live_universe(definitions, store);
    let plan = plan_import(foreign, &universe, owner)?;
    commit(&plan, store)?;
    Ok(plan)
}
