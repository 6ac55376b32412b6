//! Domain entities for dockyard.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the code base holds the rules that make the system
//! what it is: here, the rules for which dock may occupy which edge of which
//! screen, and how identifiers are renumbered when docks are copied.  Outer
//! layers (the shell's application and infrastructure code) depend on the
//! domain, but the domain never depends on them.

/// The four screen edges.
pub mod edge;

/// Attached screens and the primary-screen designation.
pub mod screen;

/// Dock definitions, leaves, and definition sets.
pub mod definition;

/// Free-edge resolution and edge-claim queries.
pub mod edges;

/// Desired placement of docks across the current screen topology.
pub mod placement;

/// Collision-free identifier allocation.
pub mod identity;

/// Identifier renumbering for duplication and import.
pub mod remap;

/// Duplicate-identifier detection.
pub mod integrity;
