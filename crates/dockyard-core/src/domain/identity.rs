//! Collision-free identifier allocation.
//!
//! Containers and leaves share one string-keyed namespace.  Duplication keeps
//! the two apart by allocating container ids from a low base and leaf ids
//! from a higher one.

use std::collections::BTreeSet;

use super::definition::EntityId;

/// First identifier tried for container-level entities.
pub const CONTAINER_ID_BASE: u32 = 12;

/// First identifier tried for leaf-level entities.
pub const LEAF_ID_BASE: u32 = 40;

/// Allocation gives up at this value (exclusive).
pub const ID_CEILING: u32 = 32000;

/// Returns the smallest identifier `>= base` that is in neither `existing`
/// nor `assigned`, or `None` when every candidate below [`ID_CEILING`] is taken.
pub fn next_id(
    existing: &BTreeSet<EntityId>,
    assigned: &BTreeSet<EntityId>,
    base: u32,
) -> Option<EntityId> {
    (base.max(1)..ID_CEILING)
        .map(EntityId)
        .find(|id| !existing.contains(id) && !assigned.contains(id))
}
