//! Definition entities handed over by the content loader.
//!
//! Everything in this module is created once by the loader before the engine
//! runs. The engine only mutates `Procedure::targets`,
//! `CreatureKind::offered`, and `Procedure::offered_by`; every other field is
//! read-only after load.

use crate::ids::{CreatureId, PartKindId, ProcedureId};

/// A capability tag carried by a body-part kind (e.g. a manipulation or
/// breathing source). `vital` marks tags whose loss is fatal to the creature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartTag {
    pub name: String,
    pub vital: bool,
}

impl PartTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vital: false,
        }
    }

    pub fn vital(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vital: true,
        }
    }
}

/// A named anatomical type (e.g. "Arm", "ModXyzTentacle"), owned by its
/// defining content pack.
#[derive(Debug, Clone)]
pub struct BodyPartKind {
    /// Stable identifier, unique across all loaded packs.
    pub def_name: String,
    /// Long display label, if the pack provides one.
    pub label: Option<String>,
    /// Short display label, if the pack provides one.
    pub label_short: Option<String>,
    /// Capability tags. Compared as a set during tag-based classification.
    pub tags: Vec<PartTag>,
}

impl BodyPartKind {
    pub fn new(def_name: impl Into<String>) -> Self {
        Self {
            def_name: def_name.into(),
            label: None,
            label_short: None,
            tags: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_label_short(mut self, label_short: impl Into<String>) -> Self {
        self.label_short = Some(label_short.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<PartTag>) -> Self {
        self.tags = tags;
        self
    }

    /// Preferred label for matching: short label, then long label, then the
    /// identifier itself.
    pub fn preferred_label(&self) -> &str {
        self.label_short
            .as_deref()
            .unwrap_or_else(|| self.label.as_deref().unwrap_or(&self.def_name))
    }

    /// True if any capability tag marks this part as vital.
    pub fn has_vital_tag(&self) -> bool {
        self.tags.iter().any(|t| t.vital)
    }
}

/// One occurrence of a body-part kind within one creature's body tree.
///
/// Labels here may override the kind's own labels (packs relabel shared kinds
/// per position, e.g. "left front paw" on a generic Paw kind). Transient:
/// read during clustering, never mutated.
#[derive(Debug, Clone)]
pub struct BodyPartInstance {
    pub kind: PartKindId,
    /// Position-specific long label override.
    pub label: Option<String>,
    /// Position-specific short label override.
    pub label_short: Option<String>,
}

impl BodyPartInstance {
    pub fn new(kind: PartKindId) -> Self {
        Self {
            kind,
            label: None,
            label_short: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_label_short(mut self, label_short: impl Into<String>) -> Self {
        self.label_short = Some(label_short.into());
        self
    }
}

/// Bio-relevant traits of a creature kind. Absent entirely for non-creature
/// things that still carry procedures (e.g. furniture a pack made operable).
#[derive(Debug, Clone, Default)]
pub struct RaceTraits {
    /// Ordered body tree. May legitimately contain duplicate kinds.
    pub body: Vec<BodyPartInstance>,
    pub is_animal: bool,
    pub is_humanlike: bool,
    pub is_mechanical: bool,
    /// False for mechanoids and for flesh-free constructs.
    pub has_living_tissue: bool,
}

/// A species/type definition.
#[derive(Debug, Clone)]
pub struct CreatureKind {
    /// Stable identifier, unique across all loaded packs.
    pub def_name: String,
    pub race: Option<RaceTraits>,
    /// Procedures offered by this creature. Must stay duplicate-free and
    /// mirrored by each referenced procedure's `offered_by` list.
    pub offered: Vec<ProcedureId>,
}

impl CreatureKind {
    pub fn new(def_name: impl Into<String>) -> Self {
        Self {
            def_name: def_name.into(),
            race: None,
            offered: Vec::new(),
        }
    }

    pub fn with_race(mut self, race: RaceTraits) -> Self {
        self.race = Some(race);
        self
    }

    pub fn with_offered(mut self, offered: Vec<ProcedureId>) -> Self {
        self.offered = offered;
        self
    }

    /// Body tree, empty when there is no race at all.
    pub fn body(&self) -> &[BodyPartInstance] {
        self.race.as_ref().map(|r| r.body.as_slice()).unwrap_or(&[])
    }

    /// True if the creature's body tree contains at least one instance of
    /// the given kind.
    pub fn has_part(&self, kind: PartKindId) -> bool {
        self.body().iter().any(|inst| inst.kind == kind)
    }
}

/// Worker-behavior identity of a procedure. Used for merge equality, for the
/// mech-only short-circuit, and for the deterministic sort ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerClass(pub String);

impl WorkerClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a procedure does to a creature's conditions: adds, removes, or
/// modifies exactly one named condition, or none of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ConditionChange {
    #[default]
    None,
    Adds(String),
    Removes(String),
    Modifies(String),
}

/// A medical recipe.
#[derive(Debug, Clone)]
pub struct Procedure {
    /// Stable identifier, unique across all loaded packs.
    pub def_name: String,
    /// Display label. Compared case-insensitively during propagation and
    /// procedure-implied clustering.
    pub label: String,
    /// Worker-behavior identity. Missing when a pack references a worker
    /// the host could not resolve; such procedures are excluded from
    /// classification and merging, never an error.
    pub worker: Option<WorkerClass>,
    pub effect: ConditionChange,
    /// Ingredient-compatibility summary, as produced by the host. Two
    /// procedures with different summaries are never merged.
    pub ingredients: Option<String>,
    /// True when the procedure targets a body part at all. With an empty
    /// `targets` list this means "any part, unconstrained".
    pub targets_body_part: bool,
    pub targets: Vec<PartKindId>,
    /// Creatures offering this procedure. Mirrors `CreatureKind::offered`.
    pub offered_by: Vec<CreatureId>,
}

impl Procedure {
    pub fn new(def_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            def_name: def_name.into(),
            label: label.into(),
            worker: None,
            effect: ConditionChange::None,
            ingredients: None,
            targets_body_part: false,
            targets: Vec::new(),
            offered_by: Vec::new(),
        }
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = Some(WorkerClass::new(worker));
        self
    }

    pub fn with_effect(mut self, effect: ConditionChange) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_ingredients(mut self, summary: impl Into<String>) -> Self {
        self.ingredients = Some(summary.into());
        self
    }

    pub fn with_targets(mut self, targets: Vec<PartKindId>) -> Self {
        self.targets_body_part = true;
        self.targets = targets;
        self
    }

    /// Mark as body-part-targeting without constraining the part.
    pub fn targeting_any_part(mut self) -> Self {
        self.targets_body_part = true;
        self
    }

    /// Lowercased display label, the comparison key for "does this creature
    /// already offer this procedure" checks.
    pub fn label_key(&self) -> String {
        self.label.to_lowercase()
    }
}
