//! Identifier renumbering for duplicated or imported definitions.
//!
//! The pipeline is:
//!
//! 1. Collect every container and leaf identifier of the source set (the
//!    "to-investigate" ids), noting every tray back-reference on the way.
//! 2. Allocate a fresh id for each container from [`CONTAINER_ID_BASE`] and
//!    for each leaf from [`LEAF_ID_BASE`], avoiding the live universe and
//!    every id already handed out in this pass.
//! 3. Undo direct transpositions (A→B while B→A) by mapping both to themselves.
//! 4. Rewrite the source into a fresh set: container ids, leaf ids, ordering
//!    lists and tray back-references all go through the same table.  Ghost
//!    containers are left out.
//!
//! If any allocation fails the whole plan fails.  Nothing is written
//! anywhere until the plan exists, so an exhausted id space never leaves a
//! half-renumbered layout behind.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, warn};

use super::definition::{DefinitionKind, DefinitionSet, EntityId, ORDER_LIST_KEYS};
use super::identity::{next_id, CONTAINER_ID_BASE, ID_CEILING, LEAF_ID_BASE};

/// Errors raised while planning a renumbering.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemapError {
    /// No free identifier was left below the ceiling.
    #[error("no free identifier below {ceiling} for entity {entity}")]
    IdentifierExhausted { entity: EntityId, ceiling: u32 },
}

/// Old-to-new identifier table for one duplication or import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    assigned: BTreeMap<EntityId, EntityId>,
    containers: Vec<EntityId>,
    leaves: Vec<EntityId>,
}

impl RemapTable {
    /// Plans fresh identifiers for every container and leaf of `source`.
    ///
    /// `universe` holds every identifier currently live in the shell.
    ///
    /// # Errors
    ///
    /// Returns [`RemapError::IdentifierExhausted`] if any entity cannot get an
    /// identifier below [`ID_CEILING`].
    pub fn plan(
        universe: &BTreeSet<EntityId>,
        source: &DefinitionSet,
    ) -> Result<Self, RemapError> {
        let mut table = RemapTable::default();
        let mut taken: BTreeSet<EntityId> = BTreeSet::new();

        for id in source.container_ids() {
            if table.containers.contains(&id) {
                continue;
            }
            table.containers.push(id);
        }
        for def in source.iter() {
            for leaf in &def.leaves {
                if table.leaves.contains(&leaf.id) || table.containers.contains(&leaf.id) {
                    continue;
                }
                table.leaves.push(leaf.id);
            }
            for tray in def.tray_containers() {
                if !source.contains(tray) {
                    debug!(
                        container = %def.id,
                        tray = %tray,
                        "tray back-reference points outside the copied set"
                    );
                }
            }
        }

        for &id in &table.containers {
            let new_id = next_id(universe, &taken, CONTAINER_ID_BASE).ok_or(
                RemapError::IdentifierExhausted {
                    entity: id,
                    ceiling: ID_CEILING,
                },
            )?;
            taken.insert(new_id);
            table.assigned.insert(id, new_id);
        }
        for &id in &table.leaves {
            let new_id = next_id(universe, &taken, LEAF_ID_BASE).ok_or(
                RemapError::IdentifierExhausted {
                    entity: id,
                    ceiling: ID_CEILING,
                },
            )?;
            taken.insert(new_id);
            table.assigned.insert(id, new_id);
        }

        debug!(assignments = ?table.assigned, "planned identifier remap");
        table.repair_transpositions();
        Ok(table)
    }

    /// Builds a table from explicit assignments.
    pub fn from_assignments(
        containers: &[(EntityId, EntityId)],
        leaves: &[(EntityId, EntityId)],
    ) -> Self {
        let mut table = RemapTable::default();
        for &(old, new) in containers {
            table.containers.push(old);
            table.assigned.insert(old, new);
        }
        for &(old, new) in leaves {
            table.leaves.push(old);
            table.assigned.insert(old, new);
        }
        table
    }

    /// Maps both halves of every direct swap (A→B, B→A) back to themselves.
    ///
    /// Returns the number of swaps repaired.  Longer cycles are left alone:
    /// the rewrite in [`RemapTable::apply`] is one simultaneous substitution
    /// into a fresh set, so a cycle is still a valid bijection.
    pub fn repair_transpositions(&mut self) -> usize {
        let mut repaired = 0;
        let order: Vec<EntityId> = self
            .containers
            .iter()
            .chain(self.leaves.iter())
            .copied()
            .collect();

        for a in order {
            let Some(&b) = self.assigned.get(&a) else {
                continue;
            };
            if a != b && self.assigned.get(&b) == Some(&a) {
                debug!(first = %a, second = %b, "repairing transposed identifier remap");
                self.assigned.insert(a, a);
                self.assigned.insert(b, b);
                repaired += 1;
            }
        }
        repaired
    }

    /// New identifier for `old`, if it was part of the plan.
    pub fn get(&self, old: EntityId) -> Option<EntityId> {
        self.assigned.get(&old).copied()
    }

    /// Newly assigned identifiers, containers and leaves together.
    pub fn new_ids(&self) -> BTreeSet<EntityId> {
        self.assigned.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Rewrites `source` through the table into a fresh set.
    ///
    /// Ghost containers are skipped.  Ordering-list elements and tray
    /// back-references that do not resolve inside the rewritten set are
    /// dropped.
    pub fn apply(&self, source: &DefinitionSet) -> DefinitionSet {
        let mut out = DefinitionSet::new();

        for def in source.iter() {
            if def.kind() == DefinitionKind::Ghost {
                debug!(container = %def.id, "skipping ghost container");
                continue;
            }
            let Some(new_id) = self.get(def.id) else {
                warn!(container = %def.id, "container missing from remap plan, skipping");
                continue;
            };

            let mut copy = def.clone();
            copy.id = new_id;

            for leaf in &mut copy.leaves {
                if let Some(id) = self.get(leaf.id) {
                    leaf.id = id;
                }
                leaf.tray_container = leaf.tray_container.and_then(|tray| {
                    let materialised = source
                        .get(tray)
                        .is_some_and(|t| t.kind() != DefinitionKind::Ghost);
                    if !materialised {
                        warn!(
                            leaf = %leaf.id,
                            tray = %tray,
                            "dropping unresolved tray back-reference"
                        );
                        return None;
                    }
                    self.get(tray)
                });
            }

            for key in ORDER_LIST_KEYS {
                if !copy.general.contains_key(key) {
                    continue;
                }
                let rewritten: Vec<EntityId> = copy
                    .order_list(key)
                    .into_iter()
                    .filter_map(|id| self.get(id))
                    .collect();
                copy.set_order_list(key, &rewritten);
            }

            out.insert(copy);
        }

        out
    }
}

/// Plans and applies a renumbering in one step.
///
/// # Errors
///
/// Propagates [`RemapError::IdentifierExhausted`] from planning.
pub fn remap_definitions(
    universe: &BTreeSet<EntityId>,
    source: &DefinitionSet,
) -> Result<(RemapTable, DefinitionSet), RemapError> {
    let table = RemapTable::plan(universe, source)?;
    let remapped = table.apply(source);
    Ok((table, remapped))
}
