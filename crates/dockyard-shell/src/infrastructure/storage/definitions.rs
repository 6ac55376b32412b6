//! Reading and writing dock definitions in a [`ConfigStore`].
//!
//! Every container lives in its own group:
//!
//! ```text
//! containments/<id>
//!     plugin, on_primary, last_screen, edge, visibility,
//!     bypass_compositor, layout_id
//!     general/             ordering lists and free-form settings
//!     leaves/<id>
//!         plugin
//!         configuration/   leaf settings, may hold tray_container_id
//! ```
//!
//! Explicit-affinity docks are stored as `on_primary = "false"` with the
//! pinned screen in `last_screen`.

use std::collections::{BTreeMap, BTreeSet};

use dockyard_core::domain::definition::DefinitionParseError;
use dockyard_core::domain::edge::ParseEdgeError;
use dockyard_core::{
    DefinitionSet, DockDefinition, Edge, EntityId, LeafDefinition, ScreenAffinity,
    VisibilityMode,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::infrastructure::config_store::{ConfigStore, StoreError};

/// Root group of all container definitions.
pub const CONTAINMENTS_GROUP: &str = "containments";

const TRAY_CONTAINER_KEY: &str = "tray_container_id";
const DEPRECATED_LEAF_KEY: &str = "preload_weight";

/// Errors raised while reading one definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error(transparent)]
    Parse(#[from] DefinitionParseError),

    #[error(transparent)]
    Edge(#[from] ParseEdgeError),

    #[error("container {0} has no group in the store")]
    Missing(EntityId),
}

fn container_group(id: EntityId) -> String {
    format!("{CONTAINMENTS_GROUP}/{id}")
}

/// Child group names parsed as identifiers, in numeric order.  Malformed
/// names are skipped.
fn child_ids(store: &dyn ConfigStore, group: &str) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = store
        .group_list(group)
        .iter()
        .filter_map(|name| match name.parse::<EntityId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("skipping group {group}/{name}: {e}");
                None
            }
        })
        .collect();
    ids.sort();
    ids
}

fn read_group_entries(store: &dyn ConfigStore, group: &str) -> BTreeMap<String, String> {
    store
        .key_list(group)
        .into_iter()
        .filter_map(|key| {
            let value = store.read_entry(group, &key)?;
            Some((key, value))
        })
        .collect()
}

// ── Reading ───────────────────────────────────────────────────────────────────

/// Reads the container stored under `containments/<id>`.
///
/// # Errors
///
/// Returns [`DefinitionError`] if the group is missing or holds an invalid
/// edge, visibility mode or tray reference.
pub fn read_definition(
    store: &dyn ConfigStore,
    id: EntityId,
) -> Result<DockDefinition, DefinitionError> {
    let group = container_group(id);
    if !store.has_group(&group) {
        return Err(DefinitionError::Missing(id));
    }

    let mut def = DockDefinition::new(id, store.read_entry_or(&group, "plugin", ""));
    def.last_screen = store
        .read_entry(&group, "last_screen")
        .filter(|s| !s.is_empty());
    def.edge = match store.read_entry(&group, "edge") {
        Some(edge) => edge.parse::<Edge>()?,
        None => Edge::default(),
    };
    def.visibility = match store.read_entry(&group, "visibility") {
        Some(mode) => mode.parse::<VisibilityMode>()?,
        None => VisibilityMode::default(),
    };
    def.bypass_compositor = store.read_entry_or(&group, "bypass_compositor", "false") == "true";
    def.layout_owner = store
        .read_entry(&group, "layout_id")
        .filter(|s| !s.is_empty());

    let on_primary = store.read_entry_or(&group, "on_primary", "true") == "true";
    def.affinity = match (&def.last_screen, on_primary) {
        (Some(screen), false) => ScreenAffinity::Explicit(screen.clone()),
        (None, false) => {
            warn!("container {id} is pinned to no screen, following the primary screen");
            ScreenAffinity::OnPrimary
        }
        (_, true) => ScreenAffinity::OnPrimary,
    };

    def.general = read_group_entries(store, &format!("{group}/general"));

    let leaves_group = format!("{group}/leaves");
    for leaf_id in child_ids(store, &leaves_group) {
        let leaf_group = format!("{leaves_group}/{leaf_id}");
        let mut leaf = LeafDefinition::new(leaf_id, store.read_entry_or(&leaf_group, "plugin", ""));
        leaf.configuration = read_group_entries(store, &format!("{leaf_group}/configuration"));
        if let Some(tray) = leaf.configuration.remove(TRAY_CONTAINER_KEY) {
            leaf.tray_container = Some(tray.parse::<EntityId>()?);
        }
        def.leaves.push(leaf);
    }

    Ok(def)
}

/// Loads every container in the store.
///
/// Deprecated leaf records are deleted on the way.  Containers that fail to
/// parse are skipped with a warning.  When `owner` is given, only containers
/// owned by that layout are returned.
///
/// # Errors
///
/// Returns [`StoreError`] if healing a deprecated record fails.
pub fn load_definitions(
    store: &mut dyn ConfigStore,
    owner: Option<&str>,
) -> Result<DefinitionSet, StoreError> {
    let mut set = DefinitionSet::new();

    for id in child_ids(store, CONTAINMENTS_GROUP) {
        heal_deprecated_leaves(store, id)?;
        match read_definition(store, id) {
            Ok(def) => set.insert(def),
            Err(e) => warn!("skipping container {id}: {e}"),
        }
    }

    if let Some(owner) = owner {
        set.retain_owned_by(owner);
    }
    debug!("loaded {} container definitions", set.len());
    Ok(set)
}

/// Deletes leaf records of container `id` whose only content is a
/// `configuration` group holding a single `preload_weight` entry.
///
/// Returns the number of records deleted.
///
/// # Errors
///
/// Returns [`StoreError`] if a deletion fails.
pub fn heal_deprecated_leaves(
    store: &mut dyn ConfigStore,
    id: EntityId,
) -> Result<usize, StoreError> {
    let leaves_group = format!("{}/leaves", container_group(id));
    let mut healed = 0;

    for name in store.group_list(&leaves_group) {
        let leaf_group = format!("{leaves_group}/{name}");
        let config_group = format!("{leaf_group}/configuration");
        let deprecated = store.key_list(&leaf_group).is_empty()
            && store.group_list(&leaf_group) == ["configuration"]
            && store.group_list(&config_group).is_empty()
            && store.key_list(&config_group) == [DEPRECATED_LEAF_KEY];

        if deprecated {
            debug!("deleting deprecated leaf record {leaf_group}");
            store.delete_group(&leaf_group)?;
            healed += 1;
        }
    }
    Ok(healed)
}

/// Every container and leaf identifier present in the store, whether or not
/// it parses as a valid definition.
pub fn stored_ids(store: &dyn ConfigStore) -> BTreeSet<EntityId> {
    let mut ids = BTreeSet::new();
    for id in child_ids(store, CONTAINMENTS_GROUP) {
        ids.insert(id);
        ids.extend(child_ids(store, &format!("{}/leaves", container_group(id))));
    }
    ids
}

// ── Writing ───────────────────────────────────────────────────────────────────

/// Writes `def` under `containments/<id>`, replacing whatever was there.
///
/// # Errors
///
/// Returns [`StoreError`] if any write fails.
pub fn write_definition(
    store: &mut dyn ConfigStore,
    def: &DockDefinition,
) -> Result<(), StoreError> {
    let group = container_group(def.id);
    store.delete_group(&group)?;

    store.write_entry(&group, "plugin", def.plugin())?;
    store.write_entry(&group, "on_primary", if def.is_on_primary() { "true" } else { "false" })?;
    if let Some(screen) = def.explicit_screen().or(def.last_screen.as_deref()) {
        store.write_entry(&group, "last_screen", screen)?;
    }
    store.write_entry(&group, "edge", def.edge.as_str())?;
    store.write_entry(&group, "visibility", def.visibility.as_str())?;
    store.write_entry(
        &group,
        "bypass_compositor",
        if def.bypass_compositor { "true" } else { "false" },
    )?;
    if let Some(owner) = &def.layout_owner {
        store.write_entry(&group, "layout_id", owner)?;
    }

    let general = format!("{group}/general");
    for (key, value) in &def.general {
        store.write_entry(&general, key, value)?;
    }

    for leaf in &def.leaves {
        let leaf_group = format!("{group}/leaves/{}", leaf.id);
        store.write_entry(&leaf_group, "plugin", &leaf.plugin)?;
        let config_group = format!("{leaf_group}/configuration");
        for (key, value) in &leaf.configuration {
            store.write_entry(&config_group, key, value)?;
        }
        if let Some(tray) = leaf.tray_container {
            store.write_entry(&config_group, TRAY_CONTAINER_KEY, &tray.to_string())?;
        }
    }
    Ok(())
}

/// Writes every definition of `set`.
///
/// # Errors
///
/// Returns the first [`StoreError`] encountered.
pub fn write_definitions(
    store: &mut dyn ConfigStore,
    set: &DefinitionSet,
) -> Result<(), StoreError> {
    for def in set.iter() {
        write_definition(store, def)?;
    }
    Ok(())
}

/// Removes `containments/<id>` from the store.
///
/// # Errors
///
/// Returns [`StoreError`] if the deletion fails.
pub fn delete_definition(store: &mut dyn ConfigStore, id: EntityId) -> Result<(), StoreError> {
    store.delete_group(&container_group(id))
}
