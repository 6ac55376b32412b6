//! Integration tests for multi-screen synchronization.
//!
//! These tests drive a `LayoutController` through its public API with a
//! `MockWindowPlatform` standing in for the compositor.  They cover:
//!
//! - docks pinned to a screen that is not attached yet, created once it is;
//! - primary docks taking precedence over explicit docks on the primary
//!   screen's edges, including after the primary screen changes;
//! - repeated synchronization with nothing changed being a no-op;
//! - the destroyed (undo-able) state freeing an edge without destroying the
//!   view.

use dockyard_core::{DockDefinition, Edge, EntityId, Screen, ScreenAffinity, ScreenTopology};
use dockyard_shell::application::events::ShellEvent;
use dockyard_shell::application::manage_layout::{LayoutController, LayoutSettings};
use dockyard_shell::application::manage_views::PlacementError;
use dockyard_shell::infrastructure::config_store::TomlConfigStore;
use dockyard_shell::infrastructure::platform::mock::MockWindowPlatform;
use dockyard_shell::infrastructure::storage::definitions::write_definition;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn laptop() -> ScreenTopology {
    ScreenTopology::new(vec![Screen::new("eDP-1", 1, true)])
}

fn laptop_with_hdmi() -> ScreenTopology {
    ScreenTopology::new(vec![
        Screen::new("eDP-1", 1, true),
        Screen::new("HDMI-1", 2, false),
    ])
}

fn hdmi_primary() -> ScreenTopology {
    ScreenTopology::new(vec![
        Screen::new("eDP-1", 1, false),
        Screen::new("HDMI-1", 2, true),
    ])
}

fn start(
    defs: &[DockDefinition],
    topology: ScreenTopology,
) -> (LayoutController, MockWindowPlatform) {
    let mut store = TomlConfigStore::in_memory();
    for def in defs {
        write_definition(&mut store, def).expect("write");
    }
    let platform = MockWindowPlatform::new(topology);
    let mut controller = LayoutController::new(
        LayoutSettings::new("default"),
        Box::new(store),
        Box::new(platform.clone()),
    );
    controller.init().expect("init");
    (controller, platform)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_dock_pinned_to_detached_screen_waits_until_it_attaches() {
    // Arrange: a dock pinned to HDMI-1 while only the laptop panel is attached.
    let (mut controller, platform) = start(
        &[DockDefinition::dock(
            12,
            ScreenAffinity::Explicit("HDMI-1".into()),
            Edge::Top,
        )],
        laptop(),
    );
    assert_eq!(controller.views_count(), 0);

    // Act
    platform.set_topology(laptop_with_hdmi());
    controller.handle(ShellEvent::ScreensChanged);

    // Assert
    let view = platform.live_view_for(EntityId(12)).expect("view on HDMI-1");
    assert_eq!(view.screen_name, "HDMI-1");
    assert_eq!(view.edge, Edge::Top);
    assert!(view.shown);
}

#[test]
fn test_direct_add_on_detached_screen_is_screen_unavailable() {
    use dockyard_shell::application::manage_views::{AddOptions, PlacementContext, ViewRegistry};

    let def = DockDefinition::dock(12, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Top);
    let defs = dockyard_core::DefinitionSet::from_definitions(vec![def.clone()]);
    let topology = laptop();
    let mut platform = MockWindowPlatform::new(topology.clone());
    let mut registry = ViewRegistry::new();
    let ctx = PlacementContext {
        definitions: &defs,
        topology: &topology,
    };

    let result = registry.add(&def, &ctx, &mut platform, AddOptions::default());

    assert_eq!(
        result,
        Err(PlacementError::ScreenUnavailable {
            definition: EntityId(12),
            screen: "HDMI-1".into(),
        })
    );
    assert_eq!(platform.created_count(), 0);
}

#[test]
fn test_detaching_and_reattaching_a_screen_recreates_its_dock() {
    let (mut controller, platform) = start(
        &[
            DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
            DockDefinition::dock(13, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Bottom),
        ],
        laptop_with_hdmi(),
    );
    assert_eq!(controller.views_count(), 2);

    platform.set_topology(laptop());
    controller.handle(ShellEvent::ScreensChanged);
    assert_eq!(controller.views_count(), 1);
    assert!(platform.live_view_for(EntityId(13)).is_none());

    platform.set_topology(laptop_with_hdmi());
    controller.handle(ShellEvent::ScreensChanged);
    assert_eq!(controller.views_count(), 2);
    assert_eq!(platform.created_count(), 3);
}

#[test]
fn test_repeated_screen_changes_without_topology_change_are_idempotent() {
    let (mut controller, platform) = start(
        &[
            DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
            DockDefinition::dock(13, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Left),
        ],
        laptop_with_hdmi(),
    );

    for _ in 0..3 {
        let report = controller.sync_screens();
        assert!(report.is_noop());
    }

    assert_eq!(platform.created_count(), 2);
    assert!(platform.destroyed_ids().is_empty());
}

#[test]
fn test_primary_dock_wins_the_edge_over_an_explicit_dock_on_the_primary_screen() {
    // Arrange: both want the bottom edge of eDP-1, which is primary.
    let (controller, platform) = start(
        &[
            DockDefinition::dock(12, ScreenAffinity::Explicit("eDP-1".into()), Edge::Bottom),
            DockDefinition::dock(13, ScreenAffinity::OnPrimary, Edge::Bottom),
        ],
        laptop(),
    );

    // Assert
    assert_eq!(controller.views_count(), 1);
    assert!(platform.live_view_for(EntityId(13)).is_some());
    assert!(platform.live_view_for(EntityId(12)).is_none());
}

#[test]
fn test_primary_switch_moves_primary_docks_and_evicts_conflicting_explicit_dock() {
    // Arrange
    let (mut controller, platform) = start(
        &[
            DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
            DockDefinition::dock(13, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Bottom),
            DockDefinition::dock(14, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Top),
        ],
        laptop_with_hdmi(),
    );
    assert_eq!(controller.views_count(), 3);

    // Act: HDMI-1 becomes primary.
    platform.set_topology(hdmi_primary());
    controller.handle(ShellEvent::ScreensChanged);

    // Assert
    assert_eq!(platform.live_view_for(EntityId(12)).expect("primary dock").screen_name, "HDMI-1");
    assert!(platform.live_view_for(EntityId(13)).is_none());
    assert!(platform.live_view_for(EntityId(14)).is_some());
    assert_eq!(controller.views_count_on("HDMI-1"), 2);
    assert_eq!(controller.views_count_on("eDP-1"), 0);
}

#[test]
fn test_destroyed_dock_frees_its_edge_but_keeps_its_view() {
    let (mut controller, platform) = start(
        &[DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom)],
        laptop(),
    );

    controller.handle(ShellEvent::DestroyedChanged {
        definition: EntityId(12),
        destroyed: true,
    });

    assert!(controller.free_edges("eDP-1").contains(&Edge::Bottom));
    assert_eq!(controller.views_count(), 0);
    assert!(platform.live_view_for(EntityId(12)).is_some());
    assert!(platform.destroyed_ids().is_empty());
}

#[test]
fn test_views_count_watch_follows_screen_changes() {
    let (mut controller, platform) = start(
        &[
            DockDefinition::dock(12, ScreenAffinity::OnPrimary, Edge::Bottom),
            DockDefinition::dock(13, ScreenAffinity::Explicit("HDMI-1".into()), Edge::Bottom),
        ],
        laptop_with_hdmi(),
    );
    let rx = controller.subscribe_views_count();

    platform.set_topology(laptop());
    controller.handle(ShellEvent::ScreensChanged);

    assert_eq!(*rx.borrow(), 1);
}
