//! Layout integrity checks.
//!
//! A healthy layout uses every identifier exactly once across containers and
//! leaves.  Violations are reported to the caller and logged.  They are never
//! corrected automatically.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::warn;

use super::definition::{DefinitionSet, EntityId};

/// Identifiers that break the one-id-one-entity rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityViolation {
    /// Identifiers used by more than one entity, containers and leaves together.
    pub duplicates: BTreeSet<EntityId>,
    /// Subset of `duplicates` used by both a container and a leaf.
    pub container_leaf_collisions: BTreeSet<EntityId>,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.duplicates.iter().map(EntityId::to_string).collect();
        write!(f, "duplicate identifiers: {}", ids.join(", "))?;
        if !self.container_leaf_collisions.is_empty() {
            write!(
                f,
                " ({} shared between a container and a leaf)",
                self.container_leaf_collisions.len()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for IntegrityViolation {}

/// Checks that no identifier is used twice in `definitions`.
///
/// # Errors
///
/// Returns the full list of offending identifiers.
pub fn check_integrity(definitions: &DefinitionSet) -> Result<(), IntegrityViolation> {
    let mut uses: BTreeMap<EntityId, usize> = BTreeMap::new();
    let containers: BTreeSet<EntityId> = definitions.container_ids().collect();
    let mut leaves: BTreeSet<EntityId> = BTreeSet::new();

    for id in definitions.container_ids() {
        *uses.entry(id).or_default() += 1;
    }
    for id in definitions.leaf_ids() {
        *uses.entry(id).or_default() += 1;
        leaves.insert(id);
    }

    let duplicates: BTreeSet<EntityId> = uses
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect();

    if duplicates.is_empty() {
        return Ok(());
    }

    let violation = IntegrityViolation {
        container_leaf_collisions: containers.intersection(&leaves).copied().collect(),
        duplicates,
    };
    warn!(%violation, "layout is broken");
    Err(violation)
}
