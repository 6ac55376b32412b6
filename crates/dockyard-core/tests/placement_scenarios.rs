//! Integration tests for desired placement and edge resolution.

use dockyard_core::domain::edges::{
    available_edges_for_view, edge_occupied_by_explicit_dock, edge_occupied_by_primary_dock,
    free_edges,
};
use dockyard_core::{
    desired_placements, DefinitionSet, DockDefinition, Edge, EntityId, PlacedView, Screen,
    ScreenAffinity, ScreenTopology,
};

fn laptop_with_monitor() -> ScreenTopology {
    ScreenTopology::new(vec![
        Screen::new("eDP-1", 10, true),
        Screen::new("HDMI-1", 11, false),
    ])
}

#[test]
fn test_two_primary_bottom_docks_materialise_only_the_first() {
    let defs = DefinitionSet::from_definitions(vec![
        DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
        DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Bottom),
        DockDefinition::dock(14, ScreenAffinity::OnPrimary, Edge::Left),
    ]);

    let desired = desired_placements(&defs, &laptop_with_monitor());

    assert!(desired.is_visible(EntityId(12)));
    assert!(!desired.is_visible(EntityId(13)));
    assert!(desired.is_visible(EntityId(14)));
    assert_eq!(desired.claimed_edges("eDP-1"), &[Edge::Bottom, Edge::Left]);
}

#[test]
fn test_primary_dock_wins_edge_against_explicit_dock_on_primary_screen() {
    let defs = DefinitionSet::from_definitions(vec![
        DockDefinition::dock(12, ScreenAffinity::Explicit("eDP-1".into()), Edge::Top),
        DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Top),
    ]);

    let desired = desired_placements(&defs, &laptop_with_monitor());

    assert_eq!(desired.visible, [EntityId(13)].into_iter().collect());
    assert!(edge_occupied_by_primary_dock(&defs, Edge::Top));
    assert!(edge_occupied_by_explicit_dock(&defs, "eDP-1", Edge::Top));
}

#[test]
fn test_explicit_dock_appears_once_its_screen_attaches() {
    let defs = DefinitionSet::from_definitions(vec![DockDefinition::dock(
        12,
        ScreenAffinity::Explicit("HDMI-1".into()),
        Edge::Top,
    )]);
    let laptop_only = ScreenTopology::new(vec![Screen::new("eDP-1", 10, true)]);

    assert!(!desired_placements(&defs, &laptop_only).is_visible(EntityId(12)));
    assert!(desired_placements(&defs, &laptop_with_monitor()).is_visible(EntityId(12)));
}

#[test]
fn test_free_edges_follow_screen_names_not_handles() {
    let placed = vec![
        PlacedView {
            definition: EntityId(12),
            screen_name: "HDMI-1".into(),
            edge: Edge::Bottom,
        },
        PlacedView {
            definition: EntityId(13),
            screen_name: "HDMI-1".into(),
            edge: Edge::Right,
        },
    ];

    let free = free_edges("HDMI-1", &placed);
    assert_eq!(free, vec![Edge::Left, Edge::Top]);
    assert!(free.len() <= 4);

    let movable = available_edges_for_view("HDMI-1", &placed, EntityId(13));
    assert_eq!(movable, vec![Edge::Left, Edge::Top, Edge::Right]);
}
