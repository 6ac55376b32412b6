//! Desired placement of docks across the attached screens.
//!
//! This is the decision half of screen synchronization: given every dock
//! definition and the current topology, which definitions *should* have a
//! live view?  The shell then creates and destroys views to match.
//!
//! # Two passes (for beginners)
//!
//! 1. Primary-affinity docks claim edges on the primary screen.  When two of
//!    them want the same edge, the first one encountered keeps it.
//! 2. Explicit-affinity docks claim their edge on their own screen, but only
//!    when that screen is attached and the edge is still unclaimed.
//!
//! Running the primary pass first is what gives primary docks precedence over
//! explicit docks pinned to the primary screen.

use std::collections::{BTreeMap, BTreeSet};

use super::definition::{DefinitionSet, EntityId};
use super::edge::Edge;
use super::screen::ScreenTopology;

/// Outcome of [`desired_placements`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredPlacement {
    /// Claimed edges per screen name, in claim order.
    pub by_screen: BTreeMap<String, Vec<Edge>>,
    /// Definitions that won a slot and should have a live view.
    pub visible: BTreeSet<EntityId>,
}

impl DesiredPlacement {
    pub fn is_visible(&self, id: EntityId) -> bool {
        self.visible.contains(&id)
    }

    /// Edges claimed on `screen_name`.
    pub fn claimed_edges(&self, screen_name: &str) -> &[Edge] {
        self.by_screen
            .get(screen_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn claim(&mut self, screen_name: &str, edge: Edge, id: EntityId) -> bool {
        let edges = self.by_screen.entry(screen_name.to_string()).or_default();
        if edges.contains(&edge) {
            return false;
        }
        edges.push(edge);
        self.visible.insert(id);
        true
    }
}

/// Computes which dock definitions should be visible, and where.
pub fn desired_placements(
    definitions: &DefinitionSet,
    topology: &ScreenTopology,
) -> DesiredPlacement {
    let mut desired = DesiredPlacement::default();

    if let Some(primary) = topology.primary() {
        for def in definitions.docks().filter(|d| d.is_on_primary()) {
            desired.claim(&primary.name, def.edge, def.id);
        }
    }

    for def in definitions.docks() {
        let Some(screen_name) = def.explicit_screen() else {
            continue;
        };
        if topology.contains(screen_name) {
            desired.claim(screen_name, def.edge, def.id);
        }
    }

    desired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::{DockDefinition, ScreenAffinity};
    use crate::domain::screen::Screen;

    fn single() -> ScreenTopology {
        ScreenTopology::new(vec![Screen::new("eDP-1", 1, true)])
    }

    fn explicit(name: &str) -> ScreenAffinity {
        ScreenAffinity::Explicit(name.to_string())
    }

    #[test]
    fn test_colliding_primary_docks_keep_first_encountered() {
        let defs = DefinitionSet::from_definitions(vec![
            DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
            DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Bottom),
            DockDefinition::dock(14, ScreenAffinity::OnPrimary, Edge::Left),
        ]);

        let desired = desired_placements(&defs, &single());

        assert_eq!(
            desired.visible,
            [EntityId(12), EntityId(14)].into_iter().collect()
        );
        assert_eq!(desired.claimed_edges("eDP-1"), &[Edge::Bottom, Edge::Left]);
    }

    #[test]
    fn test_primary_dock_beats_explicit_dock_on_primary_screen() {
        // The explicit dock comes first in the set but still loses.
        let defs = DefinitionSet::from_definitions(vec![
            DockDefinition::dock(12, explicit("eDP-1"), Edge::Top),
            DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Top),
        ]);

        let desired = desired_placements(&defs, &single());

        assert!(desired.is_visible(EntityId(13)));
        assert!(!desired.is_visible(EntityId(12)));
    }

    #[test]
    fn test_explicit_dock_on_detached_screen_is_not_visible() {
        let defs = DefinitionSet::from_definitions(vec![DockDefinition::dock(
            12,
            explicit("HDMI-1"),
            Edge::Top,
        )]);

        let desired = desired_placements(&defs, &single());
        assert!(desired.visible.is_empty());
        assert!(desired.claimed_edges("HDMI-1").is_empty());
    }

    #[test]
    fn test_explicit_docks_on_secondary_screen_share_screen_not_edge() {
        let topology = ScreenTopology::new(vec![
            Screen::new("eDP-1", 1, true),
            Screen::new("HDMI-1", 2, false),
        ]);
        let defs = DefinitionSet::from_definitions(vec![
            DockDefinition::dock(12, explicit("HDMI-1"), Edge::Top),
            DockDefinition::dock(13, explicit("HDMI-1"), Edge::Top),
            DockDefinition::dock(14, explicit("HDMI-1"), Edge::Bottom),
            DockDefinition::dock(15, ScreenAffinity::OnPrimary, Edge::Top),
        ]);

        let desired = desired_placements(&defs, &topology);

        assert_eq!(
            desired.visible,
            [EntityId(12), EntityId(14), EntityId(15)].into_iter().collect()
        );
    }

    #[test]
    fn test_primary_docks_follow_the_current_primary_screen() {
        let defs = DefinitionSet::from_definitions(vec![DockDefinition::dock(
            12,
            ScreenAffinity::OnPrimary,
            Edge::Bottom,
        )]);
        let topology = ScreenTopology::new(vec![
            Screen::new("eDP-1", 1, false),
            Screen::new("HDMI-1", 2, true),
        ]);

        let desired = desired_placements(&defs, &topology);
        assert_eq!(desired.claimed_edges("HDMI-1"), &[Edge::Bottom]);
        assert!(desired.claimed_edges("eDP-1").is_empty());
    }

    #[test]
    fn test_no_screens_means_nothing_is_visible() {
        let defs = DefinitionSet::from_definitions(vec![DockDefinition::dock(
            12,
            ScreenAffinity::OnPrimary,
            Edge::Bottom,
        )]);
        assert!(desired_placements(&defs, &ScreenTopology::default())
            .visible
            .is_empty());
    }
}
