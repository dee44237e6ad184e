//! Procedure consolidation: merges duplicate procedures that differ only by
//! target part, re-links creature back-references, and produces the
//! deterministic presentation ordering.
//!
//! Packs ship the same operation over and over with different target parts;
//! after target-list expansion those copies collapse into one procedure per
//! (worker, effect, ingredients) identity. The earliest procedure in display
//! order survives; important packs load first, so the first copy is the
//! destination.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::defs::{ConditionChange, WorkerClass};
use crate::host::HostBridge;
use crate::ids::{CreatureId, PartKindId, ProcedureId};
use crate::normalize::LabelNormalizer;
use crate::registry::DefRegistry;

/// Worker-behavior identities in presentation order: mech repair and the
/// weird stuff first, then artificial parts, implants, natural parts,
/// removals, administered items, and executions. Unknown workers sort after
/// all of these.
pub const WORKER_SORT_ORDER: &[&str] = &[
    // Mech/droid, emergency, weirder stuff
    "Disassemble",
    "RepairKit",
    "RemoveParasite",
    "MakeshiftRepair",
    "CreateBrainScan",
    "GenomeSequencing",
    "AndroidRewireSurgery",
    "RemoveSentience",
    "RerollTraits",
    "ApplyHydraulicNaniteBank",
    "ApplyHealFrameworkSystem",
    "ApplyHealCoolingSystem",
    "ApplyHealCpuSerum",
    "BodyPartRegrowth",
    "ScarRemoval",
    // Install artificial body parts
    "InstallArtificialBodyPart",
    "InstallBodyPartModule",
    "InstallArtificialBodyPartAndroid",
    "InstallFakeEye",
    // Install implants
    "InstallImplant",
    "InstallImplantSystem",
    "InstallImplantAndroid",
    "InstallAndroidPart",
    "InstallReactor",
    "InstallArtificialBrain",
    "ChangeImplantLevel",
    "NerveStapling",
    // Install natural body parts
    "InstallNaturalBodyPart",
    "InstallGeneticBodyPart",
    // Removals
    "RemoveHediff",
    "RemoveImplantSystem",
    "RemoveAndroidPart",
    "RemoveModules",
    "RemoveImplant",
    // Administer items
    "AdministerUsableItem",
    "AdministerIngestible",
    // Vanilla removals
    "RemoveBodyPart",
    // Executions
    "ExecuteByCut",
    "Lobotomy",
    // Final fallback
    "Surgery",
];

const UNKNOWN_TARGETING_ORDER: usize = 50;
const UNKNOWN_NON_TARGETING_ORDER: usize = 55;
const PART_NOT_FOUND_ORDER: usize = 999;

/// A structural failure while merging one procedure pair. Indicates a prior
/// invariant break, so it is surfaced rather than swallowed; the pair is
/// abandoned before any mutation and other pairs proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// A creature is listed as offering the redundant procedure but its own
    /// offered list disagrees.
    MergeInvariantViolation {
        kept: String,
        merged: String,
        creature: String,
    },
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::MergeInvariantViolation {
                kept,
                merged,
                creature,
            } => {
                write!(
                    f,
                    "merge invariant violation: creature {creature} is back-referenced by \
                     {merged} but does not offer it (while merging into {kept})"
                )
            }
        }
    }
}

impl std::error::Error for MergeError {}

/// What a consolidation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationStats {
    /// Redundant procedures merged away and removed from the registry.
    pub merged: usize,
    /// Merge pairs abandoned on a `MergeError`.
    pub failed: usize,
}

/// Merge identity: procedures equal on all three of these (and targeting a
/// body part at all) are the same operation applied to different parts.
type MergeKey = (WorkerClass, ConditionChange, Option<String>);

/// Collapse every merge-equivalent group into its earliest member.
///
/// Procedures without a resolvable worker identity are excluded outright;
/// there is nothing sound to compare. Each redundant procedure is merged
/// exactly once and removed from the registry before it could ever be
/// considered as a merge source again.
pub fn merge_duplicates(registry: &mut DefRegistry, host: &mut dyn HostBridge) -> ConsolidationStats {
    let mut stats = ConsolidationStats::default();

    // Just in case we have some easy dupes to clean.
    dedupe_reference_lists(registry);

    let mut survivor_by_key: HashMap<MergeKey, ProcedureId> = HashMap::new();
    let ids: Vec<_> = registry.procedure_ids().collect();
    for proc_id in ids {
        let Some(procedure) = registry.procedure(proc_id) else {
            continue;
        };
        if !procedure.targets_body_part {
            continue;
        }
        let Some(worker) = procedure.worker.clone() else {
            continue;
        };
        let key = (
            worker,
            procedure.effect.clone(),
            procedure.ingredients.clone(),
        );
        match survivor_by_key.get(&key).copied() {
            None => {
                survivor_by_key.insert(key, proc_id);
            }
            Some(survivor) => match merge_into(registry, survivor, proc_id, host) {
                Ok(()) => stats.merged += 1,
                Err(err) => {
                    warn!(error = %err, "abandoning merge pair");
                    stats.failed += 1;
                }
            },
        }
    }
    stats
}

/// Merge `redundant` into `survivor` and delete it from the registry.
/// Validates every expected back-reference before mutating anything, so a
/// violation leaves both procedures untouched.
fn merge_into(
    registry: &mut DefRegistry,
    survivor: ProcedureId,
    redundant: ProcedureId,
    host: &mut dyn HostBridge,
) -> Result<(), MergeError> {
    let Some(redundant_proc) = registry.procedure(redundant) else {
        return Ok(());
    };
    let red_targets = redundant_proc.targets.clone();
    let red_offered_by = redundant_proc.offered_by.clone();
    let red_name = redundant_proc.def_name.clone();

    // Validation pass: every back-referenced creature must actually offer
    // the redundant procedure.
    for &creature_id in &red_offered_by {
        let offers = registry
            .creature(creature_id)
            .is_some_and(|c| c.offered.contains(&redundant));
        if !offers {
            let kept = registry
                .procedure(survivor)
                .map(|p| p.def_name.clone())
                .unwrap_or_default();
            let creature = registry
                .creature(creature_id)
                .map(|c| c.def_name.clone())
                .unwrap_or_else(|| format!("#{}", creature_id.index()));
            return Err(MergeError::MergeInvariantViolation {
                kept,
                merged: red_name,
                creature,
            });
        }
    }

    // We do not trust that every link was injected on both sides: pick up
    // creatures that offer the redundant procedure without a back-reference
    // too.
    let mut offerers = red_offered_by.clone();
    let all_creatures: Vec<_> = registry.creature_ids().collect();
    for creature_id in all_creatures {
        let offers = registry
            .creature(creature_id)
            .is_some_and(|c| c.offered.contains(&redundant));
        if offers && !offerers.contains(&creature_id) {
            offerers.push(creature_id);
        }
    }

    if let Some(surv) = registry.procedure_mut(survivor) {
        for target in red_targets {
            if !surv.targets.contains(&target) {
                surv.targets.push(target);
            }
        }
        for creature_id in &red_offered_by {
            if !surv.offered_by.contains(creature_id) {
                surv.offered_by.push(*creature_id);
            }
        }
    }

    for creature_id in offerers {
        let Some(creature) = registry.creature_mut(creature_id) else {
            continue;
        };
        if creature.offered.contains(&survivor) {
            // Already offers the survivor; dropping the redundant entry
            // keeps the list duplicate-free.
            creature.offered.retain(|&p| p != redundant);
        } else if let Some(i) = creature.offered.iter().position(|&p| p == redundant) {
            // Keep the same index in the replacement.
            creature.offered[i] = survivor;
        }
        if let Some(surv) = registry.procedure_mut(survivor) {
            if !surv.offered_by.contains(&creature_id) {
                surv.offered_by.push(creature_id);
            }
        }
        host.invalidate_recipe_cache(creature_id);
    }

    registry.remove_procedure(redundant);
    Ok(())
}

fn dedupe_reference_lists(registry: &mut DefRegistry) {
    let creatures: Vec<_> = registry.creature_ids().collect();
    for creature_id in creatures {
        if let Some(creature) = registry.creature_mut(creature_id) {
            let mut seen = HashSet::new();
            creature.offered.retain(|&p| seen.insert(p));
        }
    }
    let procedures: Vec<_> = registry.procedure_ids().collect();
    for proc_id in procedures {
        if let Some(procedure) = registry.procedure_mut(proc_id) {
            let mut seen = HashSet::new();
            procedure.offered_by.retain(|&c| seen.insert(c));
        }
    }
}

/// Sort the registry's presentation order: worker preference ordinal, then
/// position of the first resolvable target in the canonical whole-body
/// ordering, then normalized display label. Purely presentational; stable
/// for identical input.
pub fn sort_procedures(
    registry: &mut DefRegistry,
    normalizer: &mut LabelNormalizer,
    canonical_body: Option<CreatureId>,
) {
    let canonical_positions: HashMap<PartKindId, usize> = canonical_body
        .and_then(|id| registry.creature(id))
        .map(|creature| {
            let mut positions = HashMap::new();
            for (i, inst) in creature.body().iter().enumerate() {
                positions.entry(inst.kind).or_insert(i);
            }
            positions
        })
        .unwrap_or_default();

    let mut keyed: Vec<(usize, usize, String, ProcedureId)> = Vec::new();
    for proc_id in registry.procedure_ids() {
        let Some(procedure) = registry.procedure(proc_id) else {
            continue;
        };

        let type_order = procedure
            .worker
            .as_ref()
            .and_then(|w| WORKER_SORT_ORDER.iter().position(|o| *o == w.as_str()))
            .unwrap_or(if procedure.targets_body_part {
                UNKNOWN_TARGETING_ORDER
            } else {
                UNKNOWN_NON_TARGETING_ORDER
            });

        let mut part_order = PART_NOT_FOUND_ORDER;
        if procedure.targets_body_part {
            for target in &procedure.targets {
                if let Some(&position) = canonical_positions.get(target) {
                    part_order = position;
                    break;
                }
            }
        }

        let label = normalizer.normalized(&procedure.label);
        keyed.push((type_order, part_order, label, proc_id));
    }

    // Stable sort: ties keep their current display order, so identical
    // input always yields identical output.
    keyed.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));
    registry.set_procedure_order(keyed.into_iter().map(|(_, _, _, id)| id).collect());
}
