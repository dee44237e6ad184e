//! Part equivalence building: clusters body-part kinds into interchangeable
//! sets.
//!
//! Three passes, in order:
//!
//! 1. Seed-guided classification: every kind appearing in any creature's
//!    body tree is tried against the curated seed vocabulary through an
//!    ordered list of label extractors. A kind is linked only when exactly
//!    one canonical name matches a given attempt; ambiguity defers to the
//!    next extractor rather than guessing. Precision over recall.
//! 2. Residual same-label clustering: kinds still unlinked to any seed
//!    group by normalized label; groups of two or more become their own
//!    clusters. This captures pack anatomy with no reference analogue.
//! 3. Procedure-implied clustering: procedures sharing a display label and
//!    a bio-category bucket imply their target parts are interchangeable,
//!    guarded against bridging two established seed clusters (one
//!    badly-behaved pack procedure must not unify arm and leg).
//!
//! The result is symmetric but deliberately not forced transitive: the
//! hand/foot synonym pool overlap means some cross-links survive, a known
//! and accepted gap.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::bio::{BioClassifier, BioMask};
use crate::defs::{BodyPartInstance, BodyPartKind, PartTag};
use crate::ids::{PartKindId, ProcedureId};
use crate::normalize::LabelNormalizer;
use crate::registry::DefRegistry;
use crate::vocab::SeedVocabulary;

/// A prospective single-step merge adding more than this many new members is
/// logged as suspicious. A diagnostic tripwire, not a hard limit.
pub const SUSPICIOUS_MERGE_THRESHOLD: usize = 10;

/// One kind's cluster bookkeeping.
#[derive(Debug, Clone)]
pub struct ClusterEntry {
    /// Kinds this entry's key is considered interchangeable with.
    pub members: BTreeSet<PartKindId>,
    /// The reference kind this entry was first linked through (itself for
    /// seed references and label-group members).
    pub keyed_part: PartKindId,
    /// True for the reference part of a curated seed cluster.
    pub is_seed: bool,
    /// Synonym pool, populated on seed entries only.
    pub synonyms: Vec<String>,
}

/// The engine's derived equivalence state. Rebuilt every run; never
/// persisted.
#[derive(Debug, Default)]
pub struct EquivalenceMap {
    entries: HashMap<PartKindId, ClusterEntry>,
    /// Seed reference kinds in vocabulary order.
    seed_keys: Vec<PartKindId>,
}

impl EquivalenceMap {
    /// Seed the map from the vocabulary: one entry per canonical name whose
    /// reference part actually exists in the registry. A missing reference
    /// part skips that seed; packs can and do omit chunks of the standard
    /// body.
    pub fn seeded(registry: &DefRegistry, vocab: &SeedVocabulary) -> Self {
        let mut map = Self::default();
        for seed in vocab.entries() {
            let Some(id) = registry.part_by_name(&seed.canonical) else {
                debug!(canonical = %seed.canonical, "seed reference part not loaded, skipping");
                continue;
            };
            map.entries.insert(
                id,
                ClusterEntry {
                    members: BTreeSet::from([id]),
                    keyed_part: id,
                    is_seed: true,
                    synonyms: seed.synonyms.clone(),
                },
            );
            map.seed_keys.push(id);
        }
        map
    }

    pub fn entry(&self, id: PartKindId) -> Option<&ClusterEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (PartKindId, &ClusterEntry)> {
        self.entries.iter().map(|(&id, e)| (id, e))
    }

    pub fn seed_keys(&self) -> &[PartKindId] {
        &self.seed_keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The set of kinds interchangeable with `kind`, always including the
    /// kind itself. Singleton for unknown kinds.
    pub fn equivalence_of(&self, kind: PartKindId) -> BTreeSet<PartKindId> {
        let mut set = self
            .entries
            .get(&kind)
            .map(|e| e.members.clone())
            .unwrap_or_default();
        set.insert(kind);
        set
    }

    /// How many distinct established seed clusters the given kinds touch.
    fn seed_overlap_count<'a>(&self, kinds: impl Iterator<Item = &'a PartKindId> + Clone) -> usize {
        self.seed_keys
            .iter()
            .filter(|&key| {
                let members = &self.entries[key].members;
                kinds.clone().any(|k| members.contains(k))
            })
            .count()
    }

    fn link_to_seed(&mut self, part: PartKindId, seed: PartKindId) {
        if let Some(entry) = self.entries.get_mut(&seed) {
            entry.members.insert(part);
        }
        self.entries
            .entry(part)
            .or_insert_with(|| ClusterEntry {
                members: BTreeSet::new(),
                keyed_part: seed,
                is_seed: false,
                synonyms: Vec::new(),
            })
            .members
            .insert(seed);
    }
}

/// Ordered label-extraction strategies for seed classification: a plain
/// strategy list applied in priority order, stopping at the first attempt
/// that produces exactly one canonical match.
type LabelExtract = fn(&BodyPartKind, &BodyPartInstance) -> Option<String>;

fn extract_instance_preferred(kind: &BodyPartKind, inst: &BodyPartInstance) -> Option<String> {
    Some(
        inst.label_short
            .clone()
            .or_else(|| inst.label.clone())
            .unwrap_or_else(|| kind.def_name.clone()),
    )
}

fn extract_kind_preferred(kind: &BodyPartKind, _inst: &BodyPartInstance) -> Option<String> {
    Some(kind.preferred_label().to_string())
}

fn extract_def_name(kind: &BodyPartKind, _inst: &BodyPartInstance) -> Option<String> {
    Some(kind.def_name.clone())
}

fn extract_label_short(_kind: &BodyPartKind, inst: &BodyPartInstance) -> Option<String> {
    inst.label_short.clone()
}

fn extract_label_long(_kind: &BodyPartKind, inst: &BodyPartInstance) -> Option<String> {
    inst.label.clone()
}

const LABEL_EXTRACTORS: &[(&str, LabelExtract)] = &[
    ("instance label", extract_instance_preferred),
    ("kind label", extract_kind_preferred),
    ("kind identifier", extract_def_name),
    ("short label", extract_label_short),
    ("long label", extract_label_long),
];

/// Build the full equivalence map for a registry. Assumes back-references
/// have been normalized and the classifier can see final offered lists.
pub fn build_equivalence(
    registry: &DefRegistry,
    vocab: &SeedVocabulary,
    normalizer: &mut LabelNormalizer,
    classifier: &mut BioClassifier,
) -> EquivalenceMap {
    let mut map = EquivalenceMap::seeded(registry, vocab);
    classify_parts_to_seeds(&mut map, registry, normalizer);
    cluster_residual_labels(&mut map, registry, normalizer);
    cluster_from_procedures(&mut map, registry, classifier);
    map
}

/// Step 1: seed-guided classification of every kind appearing in any body
/// tree.
pub fn classify_parts_to_seeds(
    map: &mut EquivalenceMap,
    registry: &DefRegistry,
    normalizer: &mut LabelNormalizer,
) {
    let creatures: Vec<_> = registry.creature_ids().collect();
    for creature_id in creatures {
        let Some(creature) = registry.creature(creature_id) else {
            continue;
        };
        for inst in creature.body() {
            // This map is actively being added to, so we check each time.
            if map.entries.contains_key(&inst.kind) {
                continue;
            }
            let Some(kind) = registry.part(inst.kind) else {
                continue;
            };
            classify_one_part(map, registry, normalizer, kind, inst);
        }
    }
}

fn classify_one_part(
    map: &mut EquivalenceMap,
    registry: &DefRegistry,
    normalizer: &mut LabelNormalizer,
    kind: &BodyPartKind,
    inst: &BodyPartInstance,
) {
    // Try really hard to only match one seed group per attempt.
    for (attempt, extract) in LABEL_EXTRACTORS {
        let Some(raw) = extract(kind, inst) else {
            continue;
        };
        let token = normalizer.normalized(&raw);
        let matched: Vec<PartKindId> = map
            .seed_keys
            .iter()
            .copied()
            .filter(|key| map.entries[key].has_synonym(&token))
            .collect();
        match matched.len() {
            1 => {
                map.link_to_seed(inst.kind, matched[0]);
                return;
            }
            0 => {}
            _ => {
                debug!(
                    part = %kind.def_name,
                    attempt,
                    token = %token,
                    "ambiguous seed classification, deferring"
                );
            }
        }
    }

    // Tag fallback for parts with no nameable label at all: the full
    // capability-tag set must be identical to the seed's, non-empty, and
    // contain a vital tag. Restricted to vital parts to bound false
    // positives from incidental tag overlap.
    let part_tags: BTreeSet<&PartTag> = kind.tags.iter().collect();
    if part_tags.is_empty() || !kind.has_vital_tag() {
        return;
    }
    let matched: Vec<PartKindId> = map
        .seed_keys
        .iter()
        .copied()
        .filter(|key| {
            registry.part(*key).is_some_and(|seed| {
                let seed_tags: BTreeSet<&PartTag> = seed.tags.iter().collect();
                part_tags == seed_tags
            })
        })
        .collect();
    if matched.len() == 1 {
        map.link_to_seed(inst.kind, matched[0]);
    } else if matched.len() > 1 {
        debug!(part = %kind.def_name, "ambiguous tag classification, deferring");
    }
}

impl ClusterEntry {
    fn has_synonym(&self, token: &str) -> bool {
        self.synonyms.iter().any(|s| s == token)
    }
}

/// Step 2: residual same-label clustering over kinds not linked as seed
/// references, across every label extractor. Groups of two or more distinct
/// kinds become clusters of their own.
pub fn cluster_residual_labels(
    map: &mut EquivalenceMap,
    registry: &DefRegistry,
    normalizer: &mut LabelNormalizer,
) {
    let mut groups: HashMap<String, BTreeSet<PartKindId>> = HashMap::new();
    let creatures: Vec<_> = registry.creature_ids().collect();

    for creature_id in creatures {
        let Some(creature) = registry.creature(creature_id) else {
            continue;
        };
        for inst in creature.body() {
            let eligible = map
                .entries
                .get(&inst.kind)
                .map(|e| !e.is_seed)
                .unwrap_or(true);
            if !eligible {
                continue;
            }
            let Some(kind) = registry.part(inst.kind) else {
                continue;
            };
            for (_, extract) in LABEL_EXTRACTORS {
                if let Some(raw) = extract(kind, inst) {
                    let token = normalizer.normalized(&raw);
                    groups.entry(token).or_default().insert(inst.kind);
                }
            }
        }
    }

    let mut grouped: Vec<_> = groups
        .into_values()
        .filter(|group| group.len() >= 2)
        .collect();
    grouped.sort(); // HashMap drain order is unspecified; keep runs identical

    for group in grouped {
        for &member in &group {
            let entry = map.entries.entry(member).or_insert_with(|| ClusterEntry {
                members: BTreeSet::new(),
                keyed_part: member,
                is_seed: false,
                synonyms: Vec::new(),
            });
            entry.members.extend(group.iter().copied());
        }
    }
}

/// Step 3: procedure-implied clustering, gated by bio-category buckets and
/// the cross-boundary guard.
pub fn cluster_from_procedures(
    map: &mut EquivalenceMap,
    registry: &DefRegistry,
    classifier: &mut BioClassifier,
) {
    // There are only a few bio buckets, so compile every creature's offered
    // list into them once.
    let mut by_bio: HashMap<BioMask, BTreeSet<ProcedureId>> = HashMap::new();
    let creatures: Vec<_> = registry.creature_ids().collect();
    for creature_id in creatures {
        let mask = classifier.classify_creature(registry, creature_id);
        let Some(creature) = registry.creature(creature_id) else {
            continue;
        };
        by_bio
            .entry(mask)
            .or_default()
            .extend(creature.offered.iter().copied());
    }

    // Synthesize every declared combination bucket from its single-bit
    // constituents, so a procedure classified e.g. fleshlike sees the whole
    // flesh-adjacent pool.
    for combo in BioMask::DECLARED {
        if combo.count() <= 1 || by_bio.contains_key(&combo) {
            continue;
        }
        let mut pool = BTreeSet::new();
        for single in BioMask::DECLARED {
            if single.count() == 1 && combo.contains_all(single) {
                if let Some(entries) = by_bio.get(&single) {
                    pool.extend(entries.iter().copied());
                }
            }
        }
        by_bio.insert(combo, pool);
    }

    let procedures: Vec<_> = registry.procedure_ids().collect();
    for &proc_id in &procedures {
        let mask = classifier.classify_procedure(registry, proc_id);
        let Some(procedure) = registry.procedure(proc_id) else {
            continue;
        };
        if !procedure.targets_body_part {
            continue;
        }
        let Some(pool) = by_bio.get(&mask) else {
            continue;
        };
        let label_key = procedure.label_key();

        // Other procedures in the same bio bucket doing "the same thing"
        // (by display label) tell us which parts are interchangeable.
        let mut implied: BTreeSet<PartKindId> = BTreeSet::new();
        for &other_id in pool {
            if other_id == proc_id {
                continue;
            }
            let Some(other) = registry.procedure(other_id) else {
                continue;
            };
            if other.targets_body_part && other.label_key() == label_key {
                implied.extend(other.targets.iter().copied());
            }
        }
        if implied.is_empty() {
            continue;
        }

        // Cross-boundary guard: a procedure whose combined part list spans
        // two or more established seed clusters must not become a bridge
        // between them.
        let boundary_hits =
            map.seed_overlap_count(implied.iter().chain(procedure.targets.iter()));
        if boundary_hits >= 2 {
            debug!(
                procedure = %procedure.def_name,
                boundary_hits,
                "procedure-implied merge crosses seed boundaries, skipping"
            );
            continue;
        }

        let mut warned_large_set = false;
        for &target in &procedure.targets {
            let entry = map.entries.entry(target).or_insert_with(|| ClusterEntry {
                members: BTreeSet::from([target]),
                keyed_part: target,
                is_seed: false,
                synonyms: Vec::new(),
            });
            let fresh = implied.difference(&entry.members).count();
            if fresh > SUSPICIOUS_MERGE_THRESHOLD && !warned_large_set {
                warn!(
                    procedure = %procedure.label,
                    target = target.index(),
                    fresh,
                    "mapping a large set of body parts from one procedure"
                );
                warned_large_set = true;
            }
            entry
                .members
                .extend(implied.iter().copied().filter(|&p| p != target));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{BodyPartKind, CreatureKind, PartTag, Procedure, RaceTraits};

    fn creature_with_parts(name: &str, parts: &[PartKindId]) -> CreatureKind {
        CreatureKind::new(name).with_race(RaceTraits {
            body: parts.iter().map(|&p| BodyPartInstance::new(p)).collect(),
            is_animal: true,
            has_living_tissue: true,
            ..RaceTraits::default()
        })
    }

    fn build(registry: &DefRegistry) -> EquivalenceMap {
        let vocab = SeedVocabulary::standard();
        let mut normalizer = LabelNormalizer::new();
        let mut classifier = BioClassifier::new();
        build_equivalence(registry, &vocab, &mut normalizer, &mut classifier)
    }

    #[test]
    fn test_seed_classification_links_both_sides() {
        let mut registry = DefRegistry::new();
        let arm = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
        // Normalizes via prefix strip + camel split + adjective strip.
        let snake_arm = registry.add_part(BodyPartKind::new("QQ_SnakeArm"));
        registry.add_creature(creature_with_parts("Human", &[arm]));
        registry.add_creature(creature_with_parts("Xeno", &[snake_arm]));

        let map = build(&registry);
        assert!(map.equivalence_of(arm).contains(&snake_arm));
        assert!(map.equivalence_of(snake_arm).contains(&arm));
    }

    #[test]
    fn test_seed_precision_arm_vs_leg() {
        let mut registry = DefRegistry::new();
        let arm = registry.add_part(BodyPartKind::new("ModArm").with_label("Left Arm"));
        let leg = registry.add_part(BodyPartKind::new("ModLeg").with_label("Left Leg"));
        registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
        registry.add_creature(creature_with_parts("Mod", &[arm, leg]));

        let map = build(&registry);
        assert!(!map.equivalence_of(arm).contains(&leg));
        assert!(!map.equivalence_of(leg).contains(&arm));
        // There is no Leg seed; the leg stays a singleton.
        assert_eq!(map.equivalence_of(leg).len(), 1);
    }

    #[test]
    fn test_ambiguous_claw_defers_and_stays_unclustered() {
        let mut registry = DefRegistry::new();
        let hand = registry.add_part(BodyPartKind::new("Hand").with_label("hand"));
        let foot = registry.add_part(BodyPartKind::new("Foot").with_label("foot"));
        let claw = registry.add_part(BodyPartKind::new("Claw").with_label("claw"));
        registry.add_creature(creature_with_parts("Crab", &[hand, foot, claw]));

        let map = build(&registry);
        // "claw" sits in the shared hand/foot pool: every attempt is
        // ambiguous, so the part is left alone rather than guessed at.
        assert_eq!(map.equivalence_of(claw).len(), 1);
        // And hand/foot are not collapsed through the shared pool either.
        assert!(!map.equivalence_of(hand).contains(&foot));
    }

    #[test]
    fn test_tag_fallback_requires_vital_and_exact_set() {
        let mut registry = DefRegistry::new();
        let heart = registry.add_part(
            BodyPartKind::new("Heart")
                .with_label("heart")
                .with_tags(vec![PartTag::vital("BloodPumpingSource")]),
        );
        let organ = registry.add_part(
            BodyPartKind::new("Organ7").with_tags(vec![PartTag::vital("BloodPumpingSource")]),
        );
        let shell = registry.add_part(
            BodyPartKind::new("Shell9").with_tags(vec![PartTag::new("ShellSegment")]),
        );
        registry.add_creature(creature_with_parts("Bug", &[heart, organ, shell]));

        let map = build(&registry);
        assert!(map.equivalence_of(heart).contains(&organ));
        // Non-vital tag sets never match through the fallback.
        assert_eq!(map.equivalence_of(shell).len(), 1);
    }

    #[test]
    fn test_residual_same_label_clustering() {
        let mut registry = DefRegistry::new();
        let a = registry.add_part(BodyPartKind::new("XenoGlowSac").with_label("glow sac"));
        let b = registry.add_part(BodyPartKind::new("GrafGlowSac").with_label("glow sacs"));
        let c = registry.add_part(BodyPartKind::new("Lonely").with_label("resonator"));
        registry.add_creature(creature_with_parts("Xeno", &[a, c]));
        registry.add_creature(creature_with_parts("Graf", &[b]));

        let map = build(&registry);
        assert!(map.equivalence_of(a).contains(&b));
        assert!(map.equivalence_of(b).contains(&a));
        // A label shared by nobody stays a singleton.
        assert_eq!(map.equivalence_of(c).len(), 1);
    }

    #[test]
    fn test_procedure_implied_clustering() {
        let mut registry = DefRegistry::new();
        let gripper = registry.add_part(BodyPartKind::new("Gripper"));
        let clamp = registry.add_part(BodyPartKind::new("Clamp"));
        let c1 = registry.add_creature(creature_with_parts("Bot1", &[gripper]));
        let c2 = registry.add_creature(creature_with_parts("Bot2", &[clamp]));
        let p1 = registry.add_procedure(
            Procedure::new("InstallGripperA", "install gripper")
                .with_worker("InstallArtificialBodyPart")
                .with_targets(vec![gripper]),
        );
        let p2 = registry.add_procedure(
            Procedure::new("InstallGripperB", "Install Gripper")
                .with_worker("InstallArtificialBodyPart")
                .with_targets(vec![clamp]),
        );
        registry.offer_procedure(c1, p1);
        registry.offer_procedure(c2, p2);

        let map = build(&registry);
        assert!(map.equivalence_of(gripper).contains(&clamp));
        assert!(map.equivalence_of(clamp).contains(&gripper));
    }

    #[test]
    fn test_cross_boundary_guard_blocks_broad_procedures() {
        let mut registry = DefRegistry::new();
        let arm = registry.add_part(BodyPartKind::new("Arm").with_label("arm"));
        let jaw = registry.add_part(BodyPartKind::new("Jaw").with_label("jaw"));
        let blob = registry.add_part(BodyPartKind::new("Blob"));
        let c1 = registry.add_creature(creature_with_parts("A", &[arm, jaw, blob]));
        let p1 = registry.add_procedure(
            Procedure::new("Regrow1", "regrowth")
                .with_worker("RegrowBodyPart")
                .with_targets(vec![arm, jaw]),
        );
        let p2 = registry.add_procedure(
            Procedure::new("Regrow2", "regrowth")
                .with_worker("RegrowBodyPart")
                .with_targets(vec![blob]),
        );
        registry.offer_procedure(c1, p1);
        registry.offer_procedure(c1, p2);

        let map = build(&registry);
        // The implied set spans the Arm and Jaw seed clusters: both merges
        // are refused, nothing bridges the two.
        assert!(!map.equivalence_of(blob).contains(&arm));
        assert!(!map.equivalence_of(arm).contains(&blob));
        assert!(!map.equivalence_of(jaw).contains(&blob));
    }

    #[test]
    fn test_missing_seed_parts_are_skipped() {
        let registry = DefRegistry::new();
        let map = EquivalenceMap::seeded(&registry, &SeedVocabulary::standard());
        assert!(map.is_empty());
        assert!(map.seed_keys().is_empty());
    }

    #[test]
    fn test_equivalence_of_unknown_kind_is_singleton() {
        let registry = DefRegistry::new();
        let map = build(&registry);
        let ghost = PartKindId::from_raw(999);
        assert_eq!(map.equivalence_of(ghost), BTreeSet::from([ghost]));
    }
}
