//! Procedure propagation: pushes equivalence knowledge back onto the
//! definition graph.
//!
//! Two passes, run in order. Target-list expansion widens each
//! body-part-targeting procedure to every part interchangeable with its
//! current targets. Assignment then offers procedures to creatures that
//! qualify for but lack them, keeping both sides of the creature/procedure
//! reference in step.
//!
//! Bio-category gating happens before this module: callers feed `assign` a
//! pre-filtered (procedures, creatures) candidate pairing, so eligibility
//! here is a pure body-compatibility predicate.

use std::collections::{BTreeSet, HashSet};

use crate::equivalence::EquivalenceMap;
use crate::host::HostBridge;
use crate::ids::{CreatureId, PartKindId, ProcedureId};
use crate::registry::DefRegistry;

/// What a propagation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Procedures whose target lists grew.
    pub procedures_expanded: usize,
    /// Part references appended across all target lists.
    pub targets_added: usize,
    /// New creature/procedure links.
    pub links_added: usize,
}

impl PropagationStats {
    pub fn merge(self, other: PropagationStats) -> Self {
        Self {
            procedures_expanded: self.procedures_expanded + other.procedures_expanded,
            targets_added: self.targets_added + other.targets_added,
            links_added: self.links_added + other.links_added,
        }
    }
}

/// Expand every body-part-targeting procedure's target list through the
/// equivalence map. A procedure whose targets already cover their
/// equivalents is untouched, which makes the pass idempotent.
pub fn expand_targets(registry: &mut DefRegistry, map: &EquivalenceMap) -> PropagationStats {
    let mut stats = PropagationStats::default();
    let procedures: Vec<_> = registry.procedure_ids().collect();
    for proc_id in procedures {
        let Some(procedure) = registry.procedure(proc_id) else {
            continue;
        };
        if !procedure.targets_body_part || procedure.targets.is_empty() {
            continue;
        }

        let current: BTreeSet<PartKindId> = procedure.targets.iter().copied().collect();
        let mut expanded = BTreeSet::new();
        for &target in &procedure.targets {
            expanded.extend(map.equivalence_of(target));
        }
        let additions: Vec<PartKindId> = expanded.difference(&current).copied().collect();
        if additions.is_empty() {
            continue;
        }

        stats.procedures_expanded += 1;
        stats.targets_added += additions.len();
        if let Some(procedure) = registry.procedure_mut(proc_id) {
            procedure.targets.extend(additions);
        }
    }
    stats
}

/// Offer each candidate procedure to each candidate creature that qualifies
/// for but lacks it.
///
/// A creature qualifies when it does not already offer a label-equal
/// procedure and the procedure is compatible: non-body-part-targeting
/// procedures always are, a targeting procedure with an unconstrained
/// (empty) target list always is, and otherwise the creature's body tree
/// must contain at least one instance of a targeted kind. Creatures whose
/// offered list was empty to begin with are skipped: they lack even the
/// basics, and adding to them is how procedures end up on hat racks.
pub fn assign(
    registry: &mut DefRegistry,
    procedures: &[ProcedureId],
    creatures: &[CreatureId],
    host: &mut dyn HostBridge,
) -> PropagationStats {
    let mut stats = PropagationStats::default();

    // Both of these are useful in procedure -> creature compatibility
    // checks; compose them outside the loops.
    let mut offered_labels: HashSet<(CreatureId, String)> = HashSet::new();
    let mut has_part: HashSet<(CreatureId, PartKindId)> = HashSet::new();
    for &creature_id in creatures {
        let Some(creature) = registry.creature(creature_id) else {
            continue;
        };
        for &offered in &creature.offered {
            if let Some(procedure) = registry.procedure(offered) {
                offered_labels.insert((creature_id, procedure.label_key()));
            }
        }
        for inst in creature.body() {
            has_part.insert((creature_id, inst.kind));
        }
    }

    for &proc_id in procedures {
        let Some(procedure) = registry.procedure(proc_id) else {
            continue;
        };
        let label_key = procedure.label_key();
        let targets_body_part = procedure.targets_body_part;
        let targets = procedure.targets.clone();

        for &creature_id in creatures {
            if offered_labels.contains(&(creature_id, label_key.clone())) {
                continue;
            }
            let Some(creature) = registry.creature(creature_id) else {
                continue;
            };
            if creature.offered.is_empty() {
                continue;
            }

            let eligible = if !targets_body_part {
                true
            } else if targets.is_empty() {
                true
            } else {
                targets
                    .iter()
                    .any(|t| has_part.contains(&(creature_id, *t)))
            };
            if !eligible {
                continue;
            }

            if registry.offer_procedure(creature_id, proc_id) {
                offered_labels.insert((creature_id, label_key.clone()));
                host.invalidate_recipe_cache(creature_id);
                stats.links_added += 1;
            }
        }
    }
    stats
}
