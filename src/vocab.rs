//! Curated vocabulary data: the part-label adjective list and the seed
//! anatomy table.
//!
//! Everything here is versioned configuration data, not engine logic. The
//! lists are empirically curated against real third-party content packs and
//! drift as packs evolve; both the normalizer and the equivalence builder
//! accept caller-supplied replacements so the data can rev independently.

/// Sub-descriptors of body parts that interfere with matching. Stripped from
/// the front and back of labels during normalization.
///
/// An unanticipated adjective under-strips a label (the part just stays
/// unmatched); it never breaks anything.
pub const PART_ADJECTIVES: &[&str] = &[
    "a",
    "the",
    "tiny",
    "small",
    "little",
    "medium",
    "big",
    "large",
    "huge",
    "internal",
    "external",
    "appendix",
    "additional",
    // Colorful mutation qualifiers seen in horror-themed packs
    "malformed",
    "pupula",
    "duplex",
    "recessed",
    "bulbous",
    "bloodshot",
    "dominant",
    "rapid-movement",
    "over-developed",
    "split",
    "zipper-shaped",
    "overbite",
    "underbite",
    "toothless",
    "scissor-shaped",
    "elongated",
    "crooked",
    "gumless",
    "spot",
    "sentient",
    "sensor",
    "set",
    "honey",
    // Species/material qualifiers
    "insect",
    "animal",
    "plant",
    "crocodile",
    "snake",
    "artificial",
    "skeletal",
    "sickle",
    "mech",
    "mecha",
    "mechanical",
    "xeno",
    // Position qualifiers
    "front",
    "frontal",
    "back",
    "rear",
    "top",
    "index",
    "middle",
    "ring",
    "segment", // + "ring"
    "left",
    "center",
    "right",
    "upper",
    "lower",
    // Ordinals
    "first",
    "second",
    "third",
    "fourth",
    "fifth",
    "sixth",
    "seventh",
    "eighth",
    "1st",
    "2nd",
    "3rd",
    "4th",
    "5th",
    "6th",
    "7th",
    "8th",
    // Abdominopelvic regions
    "hypochondriac",
    "hypocondriac", // pack-side typo, kept so the label still strips
    "lumbar",
    "iliac",
    // Insect thoracic regions
    "prothoracic",
    "mesothoracic",
    "metathoracic",
];

/// Base anatomy: each name seeds one cluster keyed by the reference part of
/// the same name, with the lowercased name as its first synonym.
const SEED_PART_NAMES: &[&str] = &[
    // Basics
    "Arm", "Shoulder", "Hand", "Finger", "Foot", "Toe", "Eye", "Ear", "Nose", "Jaw", "Head",
    "Brain", "Torso", "Heart", "Lung", "Kidney", "Liver", "Stomach", "Neck",
    // Animal parts
    "Elytra", "Tail", "Horn", "Tusk", "Trunk",
    // Bones
    "Skull", "Ribcage", "Spine", "Clavicle", "Sternum", "Humerus", "Radius", "Pelvis", "Femur",
    "Tibia",
];

/// Extra synonym pools for seeds whose non-human analogues don't share the
/// base name. Wing lives under Elytra because no reference Wing part exists,
/// even for birds.
const EXTRA_SYNONYMS: &[(&str, &[&str])] = &[
    ("Arm", &["flipper"]),
    ("Hand", &["claw", "grasper", "pincer"]),
    ("Finger", &["thumb", "pinky"]),
    ("Foot", &["hoof", "paw"]),
    ("Eye", &["sight", "seeing", "visual"]),
    ("Ear", &["antenna", "hear", "hearing", "sound"]),
    ("Nose", &["nostril", "smell", "smelling"]),
    ("Jaw", &["beak", "mouth", "maw", "teeth", "mandible"]),
    ("Torso", &["thorax", "body", "shell"]),
    ("Heart", &["reactor"]),
    ("Neck", &["pronotum"]),
    ("Elytra", &["wing"]),
];

/// One canonical anatomical name with its synonym pool.
#[derive(Debug, Clone)]
pub struct SeedEntry {
    /// Canonical name, doubling as the reference part kind's `def_name`.
    pub canonical: String,
    /// Normalized synonym tokens.
    pub synonyms: Vec<String>,
}

impl SeedEntry {
    pub fn new(canonical: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self {
            canonical: canonical.into(),
            synonyms,
        }
    }

    pub fn has_synonym(&self, token: &str) -> bool {
        self.synonyms.iter().any(|s| s == token)
    }
}

/// Result of a synonym lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMatch<'a> {
    /// No canonical name claims this token.
    None,
    /// Exactly one canonical name claims this token.
    Unique(&'a str),
    /// Two or more canonical names claim this token; callers must not
    /// auto-resolve.
    Ambiguous,
}

/// The curated table mapping canonical anatomical names to synonym pools.
#[derive(Debug, Clone)]
pub struct SeedVocabulary {
    entries: Vec<SeedEntry>,
}

impl SeedVocabulary {
    /// The standard curated table.
    ///
    /// Hand and foot share one merged pool: many non-human body plans use
    /// "claw"/"paw"/"hoof" for parts that double as both, and it is futile
    /// to separate them here. The shared tokens become ambiguous lookups,
    /// which is exactly what downstream classification wants.
    pub fn standard() -> Self {
        let mut entries: Vec<SeedEntry> = SEED_PART_NAMES
            .iter()
            .map(|name| SeedEntry::new(*name, vec![name.to_lowercase()]))
            .collect();

        for (canonical, extra) in EXTRA_SYNONYMS {
            let entry = entries
                .iter_mut()
                .find(|e| e.canonical == *canonical)
                .expect("extra synonyms reference a seed part name");
            entry.synonyms.extend(extra.iter().map(|s| s.to_string()));
        }

        let hand = entries.iter().position(|e| e.canonical == "Hand").unwrap();
        let foot = entries.iter().position(|e| e.canonical == "Foot").unwrap();
        let mut merged = entries[hand].synonyms.clone();
        for synonym in &entries[foot].synonyms {
            if !merged.contains(synonym) {
                merged.push(synonym.clone());
            }
        }
        entries[hand].synonyms = merged.clone();
        entries[foot].synonyms = merged;

        Self { entries }
    }

    /// Build from caller-curated entries.
    pub fn with_entries(entries: Vec<SeedEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SeedEntry] {
        &self.entries
    }

    /// Look up a normalized token. Multi-hit tokens (hand/foot sharing
    /// "claw") report `Ambiguous` rather than guessing.
    pub fn lookup(&self, token: &str) -> SeedMatch<'_> {
        let mut found = SeedMatch::None;
        for entry in &self.entries {
            if entry.has_synonym(token) {
                found = match found {
                    SeedMatch::None => SeedMatch::Unique(&entry.canonical),
                    _ => return SeedMatch::Ambiguous,
                };
            }
        }
        found
    }
}

impl Default for SeedVocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_seed_name_is_its_own_synonym() {
        let vocab = SeedVocabulary::standard();
        for entry in vocab.entries() {
            assert!(
                entry.has_synonym(&entry.canonical.to_lowercase()),
                "{} missing its own name",
                entry.canonical
            );
        }
    }

    #[test]
    fn test_unique_lookup() {
        let vocab = SeedVocabulary::standard();
        assert_eq!(vocab.lookup("beak"), SeedMatch::Unique("Jaw"));
        assert_eq!(vocab.lookup("reactor"), SeedMatch::Unique("Heart"));
        assert_eq!(vocab.lookup("wing"), SeedMatch::Unique("Elytra"));
        assert_eq!(vocab.lookup("dorsal fin"), SeedMatch::None);
    }

    #[test]
    fn test_hand_foot_pool_is_shared_and_ambiguous() {
        let vocab = SeedVocabulary::standard();
        let hand = vocab
            .entries()
            .iter()
            .find(|e| e.canonical == "Hand")
            .unwrap();
        let foot = vocab
            .entries()
            .iter()
            .find(|e| e.canonical == "Foot")
            .unwrap();
        assert_eq!(hand.synonyms, foot.synonyms);
        assert!(hand.has_synonym("claw"));
        assert!(hand.has_synonym("hoof"));

        // Shared tokens must never resolve to a single seed.
        assert_eq!(vocab.lookup("claw"), SeedMatch::Ambiguous);
        assert_eq!(vocab.lookup("paw"), SeedMatch::Ambiguous);
        assert_eq!(vocab.lookup("hand"), SeedMatch::Ambiguous);
    }

    #[test]
    fn test_arm_and_leg_never_share_tokens() {
        // There is deliberately no Leg seed; arm synonyms must not claim
        // leg-ish labels at all.
        let vocab = SeedVocabulary::standard();
        assert_eq!(vocab.lookup("leg"), SeedMatch::None);
    }
}
