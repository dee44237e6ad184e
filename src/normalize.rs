//! Label normalization: turns an arbitrary display or identifier string into
//! a canonical comparison key.
//!
//! Packs name the same anatomy wildly differently ("Left Front Paw",
//! "forepaw_L", "QQ_AnimalPaw"); every comparison in the engine goes through
//! the key produced here. The work is deterministic and very hot (thousands
//! of instances share a handful of distinct labels), so results are cached by
//! input string.

use std::collections::{HashMap, HashSet};

use crate::vocab::PART_ADJECTIVES;

/// Cached label canonicalizer.
#[derive(Debug)]
pub struct LabelNormalizer {
    adjectives: HashSet<String>,
    cache: HashMap<String, String>,
}

impl LabelNormalizer {
    /// Normalizer over the standard curated adjective list.
    pub fn new() -> Self {
        Self::with_adjectives(PART_ADJECTIVES.iter().copied())
    }

    /// Normalizer over a caller-curated adjective list.
    pub fn with_adjectives<I, S>(adjectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            adjectives: adjectives.into_iter().map(Into::into).collect(),
            cache: HashMap::new(),
        }
    }

    /// Canonical comparison key for a label. Idempotent:
    /// `normalized(normalized(x)) == normalized(x)`.
    pub fn normalized(&mut self, label: &str) -> String {
        if let Some(cached) = self.cache.get(label) {
            return cached.clone();
        }
        let result = simplify(label, &self.adjectives);
        self.cache.insert(label.to_string(), result.clone());
        result
    }

    /// `Option`-lifted form for attribute seams where the label may be
    /// absent entirely. An absent label normalizes to nothing, not to an
    /// empty key.
    pub fn normalized_opt(&mut self, label: Option<&str>) -> Option<String> {
        label.map(|l| self.normalized(l))
    }

    /// Drop all cached entries. Keys are arbitrary pack-supplied strings
    /// with no eviction, so the engine clears this after every run.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for LabelNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn simplify(label: &str, adjectives: &HashSet<String>) -> String {
    let mut label = label.to_string();

    // No spaces, like an identifier?
    if !label.contains(char::is_whitespace) {
        label = strip_module_prefixes(&label); // get rid of pack prefix letters like QQ_
        label = split_camel_case(&label); // AnimalJaw --> Animal Jaw
    }

    let mut label = label.to_lowercase().replace('_', " ");

    // These are anchored to the ends, so bounded repetition is warranted.
    for _ in 0..3 {
        if !label.contains(' ') {
            break;
        }
        label = strip_trailing_adjective(&label, adjectives);
        label = strip_leading_adjective(&label, adjectives);
    }

    let mut label = label.trim().to_string();
    strip_plural(&mut label); // no plurals
    strip_digit_runs(&label) // no numbers
}

/// Remove every all-caps-run-plus-underscore prefix pattern (`QQ_`), wherever
/// it appears in the identifier.
fn strip_module_prefixes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_uppercase() {
            let mut j = i;
            while j < chars.len() && chars[j].is_ascii_uppercase() {
                j += 1;
            }
            if j < chars.len() && chars[j] == '_' {
                i = j + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Insert spaces at internal case transitions: before an uppercase letter
/// following a lowercase letter or digit, and at the end of an uppercase run
/// followed by a lowercase letter ("XYZPart" --> "XYZ Part").
fn split_camel_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for i in 0..chars.len() {
        let c = chars[i];
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

/// Strip one trailing adjective token, possibly parenthesized: "paw (left)"
/// and "paw left" both become "paw".
fn strip_trailing_adjective(s: &str, adjectives: &HashSet<String>) -> String {
    let trimmed = s.trim_end();
    let Some(ws) = trimmed.rfind(char::is_whitespace) else {
        return s.to_string();
    };
    let head = trimmed[..ws].trim_end();
    let token = trimmed[ws..]
        .trim_start()
        .trim_start_matches('(')
        .trim_end_matches(')');
    let head_ends_in_word = head.chars().next_back().is_some_and(char::is_alphanumeric);
    if head_ends_in_word && adjectives.contains(token) {
        head.to_string()
    } else {
        s.to_string()
    }
}

/// Strip one leading adjective token: "left paw" becomes "paw".
fn strip_leading_adjective(s: &str, adjectives: &HashSet<String>) -> String {
    let Some(ws) = s.find(char::is_whitespace) else {
        return s.to_string();
    };
    let token = &s[..ws];
    let rest = s[ws..].trim_start();
    let rest_starts_with_word = rest.chars().next().is_some_and(char::is_alphanumeric);
    if rest_starts_with_word && adjectives.contains(token) {
        rest.to_string()
    } else {
        s.to_string()
    }
}

/// Naive pluralization removal: trailing "es" or "s".
fn strip_plural(s: &mut String) {
    if s.ends_with("es") {
        s.truncate(s.len() - 2);
    } else if s.ends_with('s') {
        s.truncate(s.len() - 1);
    }
}

/// Remove digit runs along with their surrounding whitespace ("Toe 2" -->
/// "Toe").
fn strip_digit_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            while out.ends_with(' ') {
                out.pop();
            }
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                chars.next();
            }
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
        } else {
            out.push(c);
            chars.next();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(label: &str) -> String {
        LabelNormalizer::new().normalized(label)
    }

    #[test]
    fn test_identifier_prefix_and_camel_case() {
        assert_eq!(norm("QQ_AnimalJaw"), norm("animal jaw"));
        assert_eq!(norm("QQ_AnimalJaw"), "jaw");
        assert_eq!(norm("forepaw_L"), norm("forepaw l"));
    }

    #[test]
    fn test_adjective_stripping_front_and_back() {
        assert_eq!(norm("Left Front Paw"), "paw");
        assert_eq!(norm("front paws"), "paw");
        assert_eq!(norm("Left Front Paw"), norm("front paws"));
        assert_eq!(norm("paw (left)"), "paw");
        assert_eq!(norm("tiny sickle claw"), "claw");
    }

    #[test]
    fn test_adjective_rounds_are_bounded() {
        // Four stacked leading adjectives exhaust the three rounds and the
        // innermost one survives.
        assert_eq!(norm("big small tiny huge paw"), "huge paw");
    }

    #[test]
    fn test_plural_and_digit_stripping() {
        assert_eq!(norm("Toe 2"), "toe");
        assert_eq!(norm("lungs"), "lung");
        assert_eq!(norm("claws"), "claw");
        assert_eq!(norm("3rd Eye"), "eye");
    }

    #[test]
    fn test_idempotence() {
        for label in [
            "Left Front Paw",
            "QQ_AnimalJaw",
            "front paws",
            "Toe 2",
            "malformed bulbous eye (left)",
            "Tentacle",
            "",
            "   ",
            "first second third",
        ] {
            let once = norm(label);
            assert_eq!(norm(&once), once, "not idempotent for {label:?}");
        }
    }

    #[test]
    fn test_empty_results_compare_equal() {
        // A label that strips to nothing is valid and equal to other empty
        // results.
        assert_eq!(norm("2"), "");
        assert_eq!(norm(""), "");
        assert_eq!(norm("2"), norm(""));
    }

    #[test]
    fn test_unknown_adjectives_under_strip() {
        // Not in the curated list: stays attached rather than erroring.
        assert_eq!(norm("gelatinous paw"), "gelatinous paw");
    }

    #[test]
    fn test_cache_round_trip() {
        let mut normalizer = LabelNormalizer::new();
        assert_eq!(normalizer.cache_len(), 0);
        let a = normalizer.normalized("Left Front Paw");
        let b = normalizer.normalized("Left Front Paw");
        assert_eq!(a, b);
        assert_eq!(normalizer.cache_len(), 1);
        normalizer.clear();
        assert_eq!(normalizer.cache_len(), 0);
    }

    #[test]
    fn test_normalized_opt() {
        let mut normalizer = LabelNormalizer::new();
        assert_eq!(normalizer.normalized_opt(None), None);
        assert_eq!(
            normalizer.normalized_opt(Some("Left Arm")),
            Some("arm".to_string())
        );
    }
}
