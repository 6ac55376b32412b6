//! Screen synchronizer: brings the live views in line with the topology.
//!
//! Runs on every topology change and after definitions are added, removed or
//! imported.  Each run:
//!
//! 1. computes the desired placement (primary docks first, explicit docks
//!    second, first claimant per edge wins);
//! 2. **removes** every active view whose definition is no longer desired;
//! 3. **reconciles** the remaining views, asking each to re-check its screen;
//! 4. **adds** a view for every desired definition that has none.
//!
//! Adding last means a new view only ever competes with views already at
//! their final screen and edge.  A second run with nothing changed in
//! between creates and destroys nothing.

use dockyard_core::{desired_placements, DefinitionSet, EntityId, ScreenTopology};
use tracing::{debug, info, warn};

use crate::application::manage_views::{AddOptions, PlacementContext, PlacementError, ViewRegistry};
use crate::infrastructure::platform::WindowPlatform;

/// What one synchronization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<EntityId>,
    pub destroyed: Vec<EntityId>,
    pub reverified: Vec<EntityId>,
    /// Desired definitions whose view could not be placed this time.
    pub rejected: Vec<(EntityId, PlacementError)>,
}

impl SyncReport {
    /// `true` when the run created and destroyed nothing.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty()
    }
}

/// Synchronizes `registry` with `definitions` on `topology`.
pub fn sync_views(
    registry: &mut ViewRegistry,
    definitions: &DefinitionSet,
    topology: &ScreenTopology,
    platform: &mut dyn WindowPlatform,
) -> SyncReport {
    let desired = desired_placements(definitions, topology);
    let mut report = SyncReport::default();
    let ctx = PlacementContext {
        definitions,
        topology,
    };

    // ── Remove phase ──────────────────────────────────────────────────────────
    for id in registry.active_ids() {
        if desired.is_visible(id) {
            continue;
        }
        debug!("dock {id} is no longer wanted on any screen");
        if registry.remove(id, platform) {
            report.destroyed.push(id);
        }
    }

    // ── Reconcile phase ───────────────────────────────────────────────────────
    let primary = topology.primary();
    for entry in registry.active_entries_mut() {
        let Some(def) = definitions.get(entry.definition) else {
            continue;
        };
        let target = match def.explicit_screen() {
            Some(name) => topology.by_name(name),
            None => primary,
        };
        if let Some(screen) = target {
            entry.view.reverify_screen(screen);
            report.reverified.push(entry.definition);
        }
    }

    // ── Add phase ─────────────────────────────────────────────────────────────
    for def in definitions.docks() {
        if !desired.is_visible(def.id) || registry.contains(def.id) {
            continue;
        }
        let options = match def.explicit_screen() {
            Some(screen) => AddOptions::on_screen(screen),
            None => AddOptions::default(),
        };
        match registry.add(def, &ctx, platform, options) {
            Ok(Some(_)) => report.created.push(def.id),
            Ok(None) => {}
            Err(e) => {
                warn!("could not place dock {}: {e}", def.id);
                report.rejected.push((def.id, e));
            }
        }
    }

    if !report.is_noop() {
        info!(
            "screen sync: {} created, {} destroyed, {} rejected",
            report.created.len(),
            report.destroyed.len(),
            report.rejected.len()
        );
    }
    report
}
