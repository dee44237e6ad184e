//! Bio-category classification: which broad kind of organism a creature is,
//! and which kinds of organism a procedure is used on.
//!
//! The mask gates which procedures may ever be considered for which
//! creatures; it is the coarse compatibility boundary that keeps power claws
//! off of wheelchairs and heart transplants off of drones.

use std::collections::HashMap;

use crate::defs::WorkerClass;
use crate::ids::{CreatureId, ProcedureId};
use crate::registry::DefRegistry;

/// Worker-behavior identities that only ever operate on mechanical
/// creatures, regardless of who currently offers them. Curated against real
/// pack content; configuration data in the same sense as the vocabulary
/// tables.
pub const MECH_ONLY_WORKERS: &[&str] = &[
    "ShutDown",
    "Disassemble",
    "RepairKit",
    "AndroidRewireSurgery",
    "RemoveSentience",
    "RerollTraits",
    "InstallImplantAndroid",
    "InstallArtificialBodyPartAndroid",
    "InstallArtificialBrain",
    "ApplyHydraulicNaniteBank",
    "ApplyHealFrameworkSystem",
    "ApplyHealCoolingSystem",
    "ApplyHealCpuSerum",
    "InstallAndroidPart",
    "InstallReactor",
    "RemoveAndroidPart",
];

/// A set of bio-categories represented as bitflags for efficient operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BioMask(u16);

impl BioMask {
    pub const NONE: Self = Self(0);
    pub const ANIMAL: Self = Self(1 << 0);
    pub const HUMANLIKE: Self = Self(1 << 1);
    /// Living tissue that is neither animal nor humanlike.
    pub const FLESH: Self = Self(1 << 2);
    pub const MECH: Self = Self(1 << 3);
    pub const OTHER: Self = Self(1 << 6);
    /// Things with no body plan at all that still carry procedures.
    pub const NON_PAWN: Self = Self(1 << 7);

    pub const CRITTERLIKE: Self = Self(Self::ANIMAL.0 | Self::HUMANLIKE.0);
    pub const FLESHLIKE: Self = Self(Self::CRITTERLIKE.0 | Self::FLESH.0);
    pub const SMART_PAWN: Self = Self(Self::HUMANLIKE.0 | Self::MECH.0);
    pub const PAWNLIKE: Self = Self(Self::FLESHLIKE.0 | Self::MECH.0);
    pub const ALL: Self = Self((1 << 8) - 1);

    /// Every declared mask value, single-bit and named combination alike.
    /// Bio-bucketed procedure grouping iterates this, not the full u16
    /// space.
    pub const DECLARED: [Self; 12] = [
        Self::NONE,
        Self::ANIMAL,
        Self::HUMANLIKE,
        Self::FLESH,
        Self::MECH,
        Self::OTHER,
        Self::NON_PAWN,
        Self::CRITTERLIKE,
        Self::FLESHLIKE,
        Self::SMART_PAWN,
        Self::PAWNLIKE,
        Self::ALL,
    ];

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if this mask contains every bit of the other.
    pub const fn contains_all(self, other: BioMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if this mask shares any bit with the other.
    pub const fn intersects(self, other: BioMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: BioMask) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: BioMask) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for BioMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(BioMask, &str); 6] = [
            (BioMask::ANIMAL, "animal"),
            (BioMask::HUMANLIKE, "humanlike"),
            (BioMask::FLESH, "flesh"),
            (BioMask::MECH, "mech"),
            (BioMask::OTHER, "other"),
            (BioMask::NON_PAWN, "nonpawn"),
        ];
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains_all(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Cached bio-category classifier over a definition registry.
///
/// Both classifications are deterministic and very hot during pass
/// construction, so results are cached by id. The engine computes all masks
/// once up front (after back-reference normalization) rather than relying on
/// staleness-sensitive incremental updates.
#[derive(Debug)]
pub struct BioClassifier {
    mech_workers: Vec<String>,
    creature_cache: HashMap<CreatureId, BioMask>,
    procedure_cache: HashMap<ProcedureId, BioMask>,
}

impl BioClassifier {
    pub fn new() -> Self {
        Self::with_mech_workers(MECH_ONLY_WORKERS.iter().copied())
    }

    pub fn with_mech_workers<I, S>(workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mech_workers: workers.into_iter().map(Into::into).collect(),
            creature_cache: HashMap::new(),
            procedure_cache: HashMap::new(),
        }
    }

    /// Bio-category of a creature kind. Single-valued.
    pub fn classify_creature(&mut self, registry: &DefRegistry, id: CreatureId) -> BioMask {
        if let Some(&cached) = self.creature_cache.get(&id) {
            return cached;
        }
        let result = match registry.creature(id) {
            None => BioMask::NONE,
            Some(creature) => match &creature.race {
                // Certain procedures work against non-creatures.
                None => BioMask::NON_PAWN,
                Some(race) => {
                    if race.is_mechanical || !race.has_living_tissue {
                        BioMask::MECH
                    } else if race.is_animal {
                        BioMask::ANIMAL
                    } else if race.is_humanlike {
                        BioMask::HUMANLIKE
                    } else if race.has_living_tissue {
                        BioMask::FLESH
                    } else {
                        BioMask::OTHER
                    }
                }
            },
        };
        self.creature_cache.insert(id, result);
        result
    }

    /// Bio-categories a procedure is used on: the union over every creature
    /// currently offering it, with a short-circuit for known mech-only
    /// workers. May legitimately be multi-bit, or empty for an unused
    /// procedure.
    pub fn classify_procedure(&mut self, registry: &DefRegistry, id: ProcedureId) -> BioMask {
        if let Some(&cached) = self.procedure_cache.get(&id) {
            return cached;
        }
        let Some(procedure) = registry.procedure(id) else {
            return BioMask::NONE;
        };
        if let Some(worker) = &procedure.worker {
            if self.is_mech_worker(worker) {
                self.procedure_cache.insert(id, BioMask::MECH);
                return BioMask::MECH;
            }
        }
        let offerers = procedure.offered_by.clone();
        let mut result = BioMask::NONE;
        for creature in offerers {
            result = result.union(self.classify_creature(registry, creature));
        }
        self.procedure_cache.insert(id, result);
        result
    }

    pub fn is_mech_worker(&self, worker: &WorkerClass) -> bool {
        self.mech_workers.iter().any(|w| w == worker.as_str())
    }

    /// Warm both caches for everything in the registry.
    pub fn precompute(&mut self, registry: &DefRegistry) {
        let creatures: Vec<_> = registry.creature_ids().collect();
        for id in creatures {
            self.classify_creature(registry, id);
        }
        let procedures: Vec<_> = registry.procedure_ids().collect();
        for id in procedures {
            self.classify_procedure(registry, id);
        }
    }

    pub fn clear(&mut self) {
        self.creature_cache.clear();
        self.procedure_cache.clear();
    }
}

impl Default for BioClassifier {
    fn default() -> Self {
        Self::new()
    }
}
