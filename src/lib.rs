//! xenograft: anatomical-vocabulary reconciliation across content packs.
//!
//! Independently-authored packs define creature body plans and medical
//! procedures with inconsistent naming ("Left Front Paw", "forepaw_L",
//! "Hoof"). This crate decides which body-part kinds denote the same
//! anatomy, widens procedures onto the equivalent parts, offers procedures
//! to creatures that qualify for but lack them, and consolidates the
//! resulting duplicates, once at load time, over the host's definition
//! registry.

pub mod bio;
pub mod consolidate;
pub mod defs;
pub mod engine;
pub mod equivalence;
pub mod host;
pub mod ids;
pub mod normalize;
#[cfg(feature = "serialization")]
pub mod pack;
pub mod propagate;
pub mod registry;
pub mod vocab;

#[cfg(test)]
mod tests;

pub use bio::{BioClassifier, BioMask, MECH_ONLY_WORKERS};
pub use consolidate::{
    ConsolidationStats, MergeError, WORKER_SORT_ORDER, merge_duplicates, sort_procedures,
};
pub use defs::{
    BodyPartInstance, BodyPartKind, ConditionChange, CreatureKind, PartTag, Procedure, RaceTraits,
    WorkerClass,
};
pub use engine::{Engine, EngineOptions, PassSummary, RunSummary};
pub use equivalence::{
    ClusterEntry, EquivalenceMap, SUSPICIOUS_MERGE_THRESHOLD, build_equivalence,
    classify_parts_to_seeds, cluster_from_procedures, cluster_residual_labels,
};
pub use host::{HostBridge, NoopBridge};
pub use ids::{CreatureId, PartKindId, ProcedureId};
pub use normalize::LabelNormalizer;
#[cfg(feature = "serialization")]
pub use pack::{PackError, load_pack_json};
pub use propagate::{PropagationStats, assign, expand_targets};
pub use registry::DefRegistry;
pub use vocab::{PART_ADJECTIVES, SeedEntry, SeedMatch, SeedVocabulary};
