//! JSON definition-pack ingestion for the audit tooling.
//!
//! This format is tooling-private: the audit binaries read exported pack
//! dumps with it, and tests use it for fixtures. It is not a contract the
//! host loader has to honor.

use serde::Deserialize;

use crate::defs::{
    BodyPartInstance, BodyPartKind, ConditionChange, CreatureKind, PartTag, Procedure, RaceTraits,
};
use crate::registry::DefRegistry;

/// Why a pack document could not be turned into a registry.
#[derive(Debug)]
pub enum PackError {
    Json(serde_json::Error),
    /// A body tree or target list references a part that the pack never
    /// defines.
    UnknownPart { referrer: String, part: String },
    /// A creature's offered list references a procedure that the pack never
    /// defines.
    UnknownProcedure { creature: String, procedure: String },
}

impl std::fmt::Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackError::Json(err) => write!(f, "malformed pack json: {err}"),
            PackError::UnknownPart { referrer, part } => {
                write!(f, "{referrer} references unknown part {part}")
            }
            PackError::UnknownProcedure {
                creature,
                procedure,
            } => write!(f, "{creature} offers unknown procedure {procedure}"),
        }
    }
}

impl std::error::Error for PackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PackError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PackError {
    fn from(err: serde_json::Error) -> Self {
        PackError::Json(err)
    }
}

#[derive(Debug, Deserialize)]
struct PackDoc {
    #[serde(default)]
    parts: Vec<PartDoc>,
    #[serde(default)]
    creatures: Vec<CreatureDoc>,
    #[serde(default)]
    procedures: Vec<ProcedureDoc>,
}

#[derive(Debug, Deserialize)]
struct PartDoc {
    def_name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    label_short: Option<String>,
    #[serde(default)]
    tags: Vec<TagDoc>,
}

#[derive(Debug, Deserialize)]
struct TagDoc {
    name: String,
    #[serde(default)]
    vital: bool,
}

#[derive(Debug, Deserialize)]
struct CreatureDoc {
    def_name: String,
    #[serde(default)]
    race: Option<RaceDoc>,
    #[serde(default)]
    offered: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RaceDoc {
    #[serde(default)]
    body: Vec<InstanceDoc>,
    #[serde(default)]
    is_animal: bool,
    #[serde(default)]
    is_humanlike: bool,
    #[serde(default)]
    is_mechanical: bool,
    #[serde(default = "default_true")]
    has_living_tissue: bool,
}

#[derive(Debug, Deserialize)]
struct InstanceDoc {
    kind: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    label_short: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EffectDoc {
    Adds(String),
    Removes(String),
    Modifies(String),
}

#[derive(Debug, Deserialize)]
struct ProcedureDoc {
    def_name: String,
    label: String,
    #[serde(default)]
    worker: Option<String>,
    #[serde(default)]
    effect: Option<EffectDoc>,
    #[serde(default)]
    ingredients: Option<String>,
    #[serde(default)]
    targets_body_part: bool,
    #[serde(default)]
    targets: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Parse a JSON pack document into a fresh registry.
pub fn load_pack_json(json: &str) -> Result<DefRegistry, PackError> {
    let doc: PackDoc = serde_json::from_str(json)?;
    let mut registry = DefRegistry::new();

    for part in doc.parts {
        let mut kind = BodyPartKind::new(part.def_name);
        kind.label = part.label;
        kind.label_short = part.label_short;
        kind.tags = part
            .tags
            .into_iter()
            .map(|t| PartTag {
                name: t.name,
                vital: t.vital,
            })
            .collect();
        registry.add_part(kind);
    }

    for procedure in &doc.procedures {
        let mut p = Procedure::new(procedure.def_name.clone(), procedure.label.clone());
        p.worker = procedure.worker.clone().map(crate::defs::WorkerClass::new);
        p.effect = match &procedure.effect {
            None => ConditionChange::None,
            Some(EffectDoc::Adds(c)) => ConditionChange::Adds(c.clone()),
            Some(EffectDoc::Removes(c)) => ConditionChange::Removes(c.clone()),
            Some(EffectDoc::Modifies(c)) => ConditionChange::Modifies(c.clone()),
        };
        p.ingredients = procedure.ingredients.clone();
        p.targets_body_part = procedure.targets_body_part || !procedure.targets.is_empty();
        for target in &procedure.targets {
            let id = registry
                .part_by_name(target)
                .ok_or_else(|| PackError::UnknownPart {
                    referrer: procedure.def_name.clone(),
                    part: target.clone(),
                })?;
            p.targets.push(id);
        }
        registry.add_procedure(p);
    }

    for creature in doc.creatures {
        let mut c = CreatureKind::new(creature.def_name.clone());
        if let Some(race) = creature.race {
            let mut traits = RaceTraits {
                is_animal: race.is_animal,
                is_humanlike: race.is_humanlike,
                is_mechanical: race.is_mechanical,
                has_living_tissue: race.has_living_tissue,
                ..RaceTraits::default()
            };
            for inst in race.body {
                let kind =
                    registry
                        .part_by_name(&inst.kind)
                        .ok_or_else(|| PackError::UnknownPart {
                            referrer: creature.def_name.clone(),
                            part: inst.kind.clone(),
                        })?;
                let mut instance = BodyPartInstance::new(kind);
                instance.label = inst.label;
                instance.label_short = inst.label_short;
                traits.body.push(instance);
            }
            c.race = Some(traits);
        }
        let creature_id = registry.add_creature(c);
        for offered in creature.offered {
            let procedure =
                registry
                    .procedure_by_name(&offered)
                    .ok_or_else(|| PackError::UnknownProcedure {
                        creature: creature.def_name.clone(),
                        procedure: offered.clone(),
                    })?;
            registry.offer_procedure(creature_id, procedure);
        }
    }

    Ok(registry)
}
