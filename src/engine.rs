//! Engine facade: the once-per-load reconciliation pipeline.
//!
//! Phases, in order: back-reference normalization, bio pre-caching,
//! equivalence building, target-list expansion, the configured bio-pairing
//! assignment passes, consolidation, and the deterministic sort. The engine
//! is single-threaded and synchronous; the host guarantees at most one run
//! in flight. All caches are rebuilt per run and cleared at the end so large
//! pack collections don't pin label strings forever.
//!
//! Running the pipeline twice over an already-processed registry changes
//! nothing: expansion is subset-checked, assignment is label-deduped, and
//! merged procedures are simply gone.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::bio::{BioClassifier, BioMask};
use crate::consolidate::{self, ConsolidationStats};
use crate::equivalence::{self, EquivalenceMap};
use crate::host::HostBridge;
use crate::ids::{CreatureId, ProcedureId};
use crate::normalize::LabelNormalizer;
use crate::propagate::{self, PropagationStats};
use crate::registry::DefRegistry;
use crate::vocab::SeedVocabulary;

/// Worker identities treated as artificial-part installs for the
/// artificial-to-mech pass.
const ARTIFICIAL_INSTALL_WORKERS: &[&str] = &[
    "InstallArtificialBodyPart",
    "InstallBodyPartModule",
    "InstallArtificialBodyPartAndroid",
];

/// The engine's whole configuration surface: which bio pairings to
/// propagate across, and which creature supplies the canonical body
/// ordering for the final sort.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub patch_animal_to_animal: bool,
    pub patch_humanlike_to_humanlike: bool,
    pub patch_artificial_to_mech: bool,
    pub patch_animal_to_humanlike: bool,
    pub patch_humanlike_to_animal: bool,
    /// Off by default.
    pub patch_humanlike_to_mech: bool,
    /// Off by default.
    pub patch_mechlike_to_humanlike: bool,
    /// `def_name` of the creature whose body tree orders the final sort.
    pub canonical_body: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            patch_animal_to_animal: true,
            patch_humanlike_to_humanlike: true,
            patch_artificial_to_mech: true,
            patch_animal_to_humanlike: true,
            patch_humanlike_to_animal: true,
            patch_humanlike_to_mech: false,
            patch_mechlike_to_humanlike: false,
            canonical_body: "Human".to_string(),
        }
    }
}

/// One assignment pass's outcome.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub name: &'static str,
    /// Candidate procedure count times candidate creature count.
    pub combinations: usize,
    pub links_added: usize,
    pub elapsed: Duration,
}

/// What a full run did, for the operator log and the audit tooling.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cluster_entries: usize,
    pub seed_clusters: usize,
    pub expansion: PropagationStats,
    pub passes: Vec<PassSummary>,
    pub merged: usize,
    pub failed_merges: usize,
    pub procedures_remaining: usize,
    pub elapsed: Duration,
}

/// The reconciliation engine. Holds the curated vocabulary and every
/// per-run cache; build one, run it once per load cycle.
#[derive(Debug)]
pub struct Engine {
    options: EngineOptions,
    vocab: SeedVocabulary,
    normalizer: LabelNormalizer,
    classifier: BioClassifier,
    equivalence: Option<EquivalenceMap>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            vocab: SeedVocabulary::standard(),
            normalizer: LabelNormalizer::new(),
            classifier: BioClassifier::new(),
            equivalence: None,
        }
    }

    /// Swap in a caller-curated vocabulary (the tables are versioned data).
    pub fn with_vocabulary(mut self, vocab: SeedVocabulary) -> Self {
        self.vocab = vocab;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The equivalence map from the most recent run, until caches are
    /// cleared.
    pub fn equivalence(&self) -> Option<&EquivalenceMap> {
        self.equivalence.as_ref()
    }

    /// Run the full pipeline over a registry.
    pub fn run(&mut self, registry: &mut DefRegistry, host: &mut dyn HostBridge) -> RunSummary {
        let run_start = Instant::now();
        let mut summary = RunSummary::default();

        // Prep work: we lean on creature.offered for every check, so fold
        // the procedure-side back-references into it and dedupe, then make
        // the procedure side whole too.
        let prep_start = Instant::now();
        self.normalize_back_references(registry);
        self.classifier.precompute(registry);
        info!(
            creatures = registry.creature_count(),
            procedures = registry.procedure_count(),
            elapsed_ms = prep_start.elapsed().as_millis() as u64,
            "prep work and bio pre-caching done"
        );

        // Equivalence building.
        let build_start = Instant::now();
        let map = equivalence::build_equivalence(
            registry,
            &self.vocab,
            &mut self.normalizer,
            &mut self.classifier,
        );
        summary.cluster_entries = map.len();
        summary.seed_clusters = map.seed_keys().len();
        info!(
            entries = map.len(),
            seeds = map.seed_keys().len(),
            elapsed_ms = build_start.elapsed().as_millis() as u64,
            "part equivalence map built"
        );

        // Target-list expansion.
        let expand_start = Instant::now();
        summary.expansion = propagate::expand_targets(registry, &map);
        info!(
            procedures = summary.expansion.procedures_expanded,
            targets = summary.expansion.targets_added,
            elapsed_ms = expand_start.elapsed().as_millis() as u64,
            "expanded procedure target lists"
        );
        self.equivalence = Some(map);

        // Assignment passes over the enabled bio pairings.
        for pass in self.enabled_passes() {
            let pass_summary = self.run_pass(registry, host, pass);
            info!(
                pass = pass_summary.name,
                links = pass_summary.links_added,
                combinations = pass_summary.combinations,
                elapsed_ms = pass_summary.elapsed.as_millis() as u64,
                "injected procedures"
            );
            summary.passes.push(pass_summary);
        }

        // Merge duplicate procedures and settle the presentation order.
        let merge_start = Instant::now();
        let ConsolidationStats { merged, failed } = consolidate::merge_duplicates(registry, host);
        let canonical = registry.creature_by_name(&self.options.canonical_body);
        if canonical.is_none() {
            debug!(
                canonical_body = %self.options.canonical_body,
                "canonical body creature not loaded; sorting by worker and label only"
            );
        }
        consolidate::sort_procedures(registry, &mut self.normalizer, canonical);
        summary.merged = merged;
        summary.failed_merges = failed;
        summary.procedures_remaining = registry.procedure_count();
        info!(
            merged,
            failed,
            remaining = summary.procedures_remaining,
            elapsed_ms = merge_start.elapsed().as_millis() as u64,
            "merged duplicate procedures and sorted"
        );

        summary.elapsed = run_start.elapsed();

        // No need to occupy all of this memory between runs.
        self.clear_all_caches();
        summary
    }

    /// Drop every per-run cache: the normalizer's label cache, both bio
    /// caches, and the equivalence map.
    pub fn clear_all_caches(&mut self) {
        self.normalizer.clear();
        self.classifier.clear();
        self.equivalence = None;
    }

    fn normalize_back_references(&mut self, registry: &mut DefRegistry) {
        let procedures: Vec<_> = registry.procedure_ids().collect();
        for proc_id in procedures {
            let offered_by = registry
                .procedure(proc_id)
                .map(|p| p.offered_by.clone())
                .unwrap_or_default();
            for creature_id in offered_by {
                if let Some(creature) = registry.creature_mut(creature_id) {
                    if !creature.offered.contains(&proc_id) {
                        creature.offered.push(proc_id);
                    }
                }
            }
        }
        let creatures: Vec<_> = registry.creature_ids().collect();
        for creature_id in creatures {
            let offered = registry
                .creature(creature_id)
                .map(|c| c.offered.clone())
                .unwrap_or_default();
            for proc_id in offered {
                if let Some(procedure) = registry.procedure_mut(proc_id) {
                    if !procedure.offered_by.contains(&creature_id) {
                        procedure.offered_by.push(creature_id);
                    }
                }
            }
        }
    }

    fn enabled_passes(&self) -> Vec<BioPass> {
        let mut passes = Vec::new();
        let o = &self.options;
        if o.patch_animal_to_animal {
            passes.push(BioPass::AnimalToAnimal);
        }
        if o.patch_humanlike_to_humanlike {
            passes.push(BioPass::HumanlikeToHumanlike);
        }
        if o.patch_artificial_to_mech {
            passes.push(BioPass::ArtificialToMech);
        }
        if o.patch_animal_to_humanlike {
            passes.push(BioPass::AnimalToHumanlike);
        }
        if o.patch_humanlike_to_animal {
            passes.push(BioPass::HumanlikeToAnimal);
        }
        // Only when every flesh pairing is on does the catch-all fleshlike
        // pass make sense.
        if o.patch_animal_to_animal
            && o.patch_humanlike_to_humanlike
            && o.patch_animal_to_humanlike
            && o.patch_humanlike_to_animal
        {
            passes.push(BioPass::FleshlikeToFleshlike);
        }
        if o.patch_humanlike_to_mech {
            passes.push(BioPass::HumanlikeToMech);
        }
        if o.patch_mechlike_to_humanlike {
            passes.push(BioPass::MechlikeToHumanlike);
        }
        passes
    }

    fn run_pass(
        &mut self,
        registry: &mut DefRegistry,
        host: &mut dyn HostBridge,
        pass: BioPass,
    ) -> PassSummary {
        let start = Instant::now();
        let mut procedures: Vec<ProcedureId> = Vec::new();
        let mut creatures: Vec<CreatureId> = Vec::new();

        for proc_id in registry.procedure_ids() {
            let mask = self.classifier.classify_procedure(registry, proc_id);
            let eligible = match pass {
                BioPass::AnimalToAnimal | BioPass::AnimalToHumanlike => {
                    mask.intersects(BioMask::ANIMAL)
                }
                BioPass::HumanlikeToHumanlike | BioPass::HumanlikeToAnimal => {
                    mask.intersects(BioMask::HUMANLIKE.union(BioMask::FLESH))
                }
                BioPass::FleshlikeToFleshlike => mask.intersects(BioMask::FLESHLIKE),
                BioPass::HumanlikeToMech => mask == BioMask::HUMANLIKE,
                BioPass::MechlikeToHumanlike => mask == BioMask::MECH,
                BioPass::ArtificialToMech => {
                    mask == BioMask::MECH
                        || registry
                            .procedure(proc_id)
                            .and_then(|p| p.worker.as_ref())
                            .is_some_and(|w| ARTIFICIAL_INSTALL_WORKERS.contains(&w.as_str()))
                }
            };
            if eligible {
                procedures.push(proc_id);
            }
        }

        for creature_id in registry.creature_ids() {
            let mask = self.classifier.classify_creature(registry, creature_id);
            let eligible = match pass {
                BioPass::AnimalToAnimal | BioPass::HumanlikeToAnimal => mask == BioMask::ANIMAL,
                BioPass::HumanlikeToHumanlike
                | BioPass::AnimalToHumanlike
                | BioPass::MechlikeToHumanlike => mask == BioMask::HUMANLIKE,
                BioPass::ArtificialToMech | BioPass::HumanlikeToMech => mask == BioMask::MECH,
                BioPass::FleshlikeToFleshlike => {
                    mask != BioMask::MECH && mask != BioMask::NON_PAWN
                }
            };
            if eligible {
                creatures.push(creature_id);
            }
        }

        let combinations = procedures.len() * creatures.len();
        let stats = propagate::assign(registry, &procedures, &creatures, host);
        PassSummary {
            name: pass.name(),
            combinations,
            links_added: stats.links_added,
            elapsed: start.elapsed(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// The bio-category pairings the engine can propagate across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BioPass {
    AnimalToAnimal,
    HumanlikeToHumanlike,
    ArtificialToMech,
    AnimalToHumanlike,
    HumanlikeToAnimal,
    FleshlikeToFleshlike,
    HumanlikeToMech,
    MechlikeToHumanlike,
}

impl BioPass {
    fn name(self) -> &'static str {
        match self {
            BioPass::AnimalToAnimal => "animal to animals",
            BioPass::HumanlikeToHumanlike => "humanlike to humanlikes",
            BioPass::ArtificialToMech => "artificial parts to mechs",
            BioPass::AnimalToHumanlike => "animal to humanlikes",
            BioPass::HumanlikeToAnimal => "humanlike to animals",
            BioPass::FleshlikeToFleshlike => "fleshlike to fleshlikes",
            BioPass::HumanlikeToMech => "humanlike to mechs",
            BioPass::MechlikeToHumanlike => "mechlike to humanlikes",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{BodyPartInstance, BodyPartKind, CreatureKind, Procedure, RaceTraits};
    use crate::host::NoopBridge;
    use crate::ids::PartKindId;

    fn animal_with_parts(name: &str, parts: &[PartKindId]) -> CreatureKind {
        CreatureKind::new(name).with_race(RaceTraits {
            body: parts.iter().map(|&p| BodyPartInstance::new(p)).collect(),
            is_animal: true,
            has_living_tissue: true,
            ..RaceTraits::default()
        })
    }

    #[test]
    fn test_run_propagates_across_equivalent_parts() {
        let mut registry = DefRegistry::new();
        let hand = registry.add_part(BodyPartKind::new("Hand").with_label("hand"));
        let grasper = registry.add_part(BodyPartKind::new("Grasper").with_label("grasper"));
        let dog = registry.add_creature(animal_with_parts("Dog", &[hand]));
        let crab = registry.add_creature(animal_with_parts("Crab", &[grasper]));
        let install = registry.add_procedure(
            Procedure::new("InstallPowerClaw", "install power claw")
                .with_worker("InstallArtificialBodyPart")
                .with_targets(vec![hand]),
        );
        registry.offer_procedure(dog, install);
        let baseline = registry.add_procedure(Procedure::new("Baseline", "baseline"));
        registry.offer_procedure(crab, baseline);

        let mut engine = Engine::new();
        engine.run(&mut registry, &mut NoopBridge);

        // "grasper" classified into the Hand seed cluster, the target list
        // grew, and the crab picked the procedure up.
        let proc = registry.procedure(install).unwrap();
        assert!(proc.targets.contains(&grasper));
        assert!(registry.creature(crab).unwrap().offered.contains(&install));
        assert!(registry.bidirectional_violations().is_empty());
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let mut registry = DefRegistry::new();
        let hand = registry.add_part(BodyPartKind::new("Hand").with_label("hand"));
        let grasper = registry.add_part(BodyPartKind::new("Grasper").with_label("grasper"));
        let dog = registry.add_creature(animal_with_parts("Dog", &[hand]));
        let crab = registry.add_creature(animal_with_parts("Crab", &[grasper]));
        let a = registry.add_procedure(
            Procedure::new("InstallClawA", "install power claw")
                .with_worker("InstallArtificialBodyPart")
                .with_targets(vec![hand]),
        );
        let b = registry.add_procedure(
            Procedure::new("InstallClawB", "install power claw")
                .with_worker("InstallArtificialBodyPart")
                .with_targets(vec![grasper]),
        );
        registry.offer_procedure(dog, a);
        registry.offer_procedure(crab, b);

        let snapshot = |registry: &DefRegistry| {
            registry
                .procedure_ids()
                .map(|id| {
                    let p = registry.procedure(id).unwrap();
                    (id, p.targets.clone(), p.offered_by.clone())
                })
                .collect::<Vec<_>>()
        };

        let mut engine = Engine::new();
        let first = engine.run(&mut registry, &mut NoopBridge);
        assert_eq!(first.merged, 1);
        let after_first = snapshot(&registry);

        let second = engine.run(&mut registry, &mut NoopBridge);
        assert_eq!(second.merged, 0);
        assert_eq!(second.expansion, PropagationStats::default());
        assert_eq!(snapshot(&registry), after_first);
    }

    #[test]
    fn test_mech_pairs_off_by_default() {
        let mut registry = DefRegistry::new();
        let arm = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
        let colonist = registry.add_creature(CreatureKind::new("Colonist").with_race(RaceTraits {
            body: vec![BodyPartInstance::new(arm)],
            is_humanlike: true,
            has_living_tissue: true,
            ..RaceTraits::default()
        }));
        let drone = registry.add_creature(CreatureKind::new("Drone").with_race(RaceTraits {
            body: vec![BodyPartInstance::new(arm)],
            is_mechanical: true,
            ..RaceTraits::default()
        }));
        let human_only = registry.add_procedure(
            Procedure::new("InstallTongue", "install tongue")
                .with_worker("InstallNaturalBodyPart")
                .with_targets(vec![arm]),
        );
        registry.offer_procedure(colonist, human_only);
        let drone_seed = registry.add_procedure(
            Procedure::new("Patch", "patch plating").with_worker("RepairKit"),
        );
        registry.offer_procedure(drone, drone_seed);

        let mut engine = Engine::new();
        engine.run(&mut registry, &mut NoopBridge);
        assert!(
            !registry
                .creature(drone)
                .unwrap()
                .offered
                .contains(&human_only)
        );
    }

    #[test]
    fn test_run_survives_malformed_definitions() {
        let mut registry = DefRegistry::new();
        // A creature with no race, a creature with an empty body tree, and
        // a procedure with no resolvable worker.
        registry.add_creature(CreatureKind::new("AncientCrate"));
        let empty = registry.add_creature(
            CreatureKind::new("Mist").with_race(RaceTraits {
                has_living_tissue: true,
                ..RaceTraits::default()
            }),
        );
        let arm = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
        let mystery = registry.add_procedure(
            Procedure::new("Mystery", "mystery rite").with_targets(vec![arm]),
        );
        let _ = registry.add_procedure(
            Procedure::new("Mystery2", "mystery rite").with_targets(vec![arm]),
        );

        let mut engine = Engine::new();
        let summary = engine.run(&mut registry, &mut NoopBridge);

        // Workerless procedures are excluded from merging, not crashed on.
        assert_eq!(summary.merged, 0);
        assert!(registry.procedure(mystery).is_some());
        assert!(registry.creature(empty).unwrap().offered.is_empty());
    }
}
