//! # dockyard-core
//!
//! Shared domain library for dockyard: the data model of dock definitions
//! and the pure algorithms that decide where docks live.
//!
//! This crate has zero dependencies on windowing systems, config files, or
//! async runtimes.  Everything here can be unit-tested with plain values.
//!
//! # Architecture overview (for beginners)
//!
//! dockyard manages *layouts*: named collections of docks (panels).  Each
//! dock is described by a persisted **definition** that says which screen
//! and which screen edge it wants.  At runtime the shell turns definitions
//! into live **views** bound to real screens.
//!
//! This crate (`dockyard-core`) defines:
//!
//! - **`domain::edge`** / **`domain::screen`** – The four screen edges and the
//!   currently attached screen topology.
//!
//! - **`domain::definition`** – Dock definitions, their nested leaves, and the
//!   per-layout definition set.
//!
//! - **`domain::edges`** – The edge resolver: which edges of a screen are
//!   still free, and whether a definition already claims an edge.
//!
//! - **`domain::placement`** – The desired-placement computation used by the
//!   screen synchronizer (primary docks first, explicit docks second).
//!
//! - **`domain::identity`** / **`domain::remap`** – Collision-free identifier
//!   allocation and the renumbering pipeline used to duplicate or import docks.
//!
//! - **`domain::integrity`** – Detection of duplicate identifiers inside a
//!   definition set.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `dockyard_core::Edge` instead of `dockyard_core::domain::edge::Edge`.
pub use domain::definition::{
    DefinitionKind, DefinitionSet, DockDefinition, EntityId, LeafDefinition, MemoryUsage,
    ScreenAffinity, VisibilityMode,
};
pub use domain::edge::Edge;
pub use domain::edges::PlacedView;
pub use domain::integrity::{check_integrity, IntegrityViolation};
pub use domain::placement::{desired_placements, DesiredPlacement};
pub use domain::remap::{remap_definitions, RemapError, RemapTable};
pub use domain::screen::{Screen, ScreenHandle, ScreenTopology};
