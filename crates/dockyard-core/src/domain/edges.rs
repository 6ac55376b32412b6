//! Edge resolver.
//!
//! Two kinds of question are answered here:
//!
//! - *Which edges of a screen are free right now?*  Answered from the live
//!   views ([`PlacedView`]), matched by screen **name**.  Screen indices are
//!   not stable across topology changes, names are.
//! - *Does some definition already claim an edge?*  Answered from the
//!   definitions, before any view exists.  Used to reject a conflicting
//!   placement up front.

use super::definition::{DefinitionSet, EntityId};
use super::edge::Edge;

/// A live view as seen by the edge resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedView {
    /// Definition the view is bound to.
    pub definition: EntityId,
    /// Name of the screen the view is currently on.
    pub screen_name: String,
    /// Edge the view currently occupies.
    pub edge: Edge,
}

/// Returns the edges of `screen_name` not occupied by any placed view.
///
/// The result keeps the order of [`Edge::ALL`] and never holds more than four
/// edges.
pub fn free_edges<'a>(
    screen_name: &str,
    placed: impl IntoIterator<Item = &'a PlacedView>,
) -> Vec<Edge> {
    let mut edges = Edge::ALL.to_vec();
    for view in placed {
        if view.screen_name == screen_name {
            edges.retain(|e| *e != view.edge);
        }
    }
    edges
}

/// Like [`free_edges`], but ignores the view bound to `excluding`, so a view
/// can ask which edges it could move to.
pub fn available_edges_for_view<'a>(
    screen_name: &str,
    placed: impl IntoIterator<Item = &'a PlacedView>,
    excluding: EntityId,
) -> Vec<Edge> {
    free_edges(
        screen_name,
        placed.into_iter().filter(|v| v.definition != excluding),
    )
}

/// Returns `true` if an explicit-affinity dock definition pinned to
/// `screen_name` claims `edge`.
pub fn edge_occupied_by_explicit_dock(
    definitions: &DefinitionSet,
    screen_name: &str,
    edge: Edge,
) -> bool {
    definitions
        .docks()
        .any(|d| d.explicit_screen() == Some(screen_name) && d.edge == edge)
}

/// Returns `true` if a primary-affinity dock definition claims `edge`.
pub fn edge_occupied_by_primary_dock(definitions: &DefinitionSet, edge: Edge) -> bool {
    definitions
        .docks()
        .any(|d| d.is_on_primary() && d.edge == edge)
}
