//! Query expansion — turns one user string into an ordered list of search
//! variants.
//!
//! The upstream search is tokenized (OR-of-words) unless told otherwise, so
//! recall depends on asking the same question several ways: the exact
//! phrase first, then a canonical manufacturer name when the input looks
//! like a known alias, then a trailing-wildcard form for single terms, then
//! device synonyms. Priority is fixed — exact > manufacturer-normalized >
//! wildcard > synonym — and the cap truncates strictly from the tail, never
//! reorders.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

/// How a variant was generated. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// The user's phrase, matched exactly.
    Exact,
    /// Canonical manufacturer name resolved from an alias.
    ManufacturerNormalized,
    /// Trailing-wildcard form, only for unspaced terms.
    Wildcard,
    /// Known device synonym.
    Synonym,
}

/// One alternate phrasing of the user query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub text: String,
    pub kind: VariantKind,
}

/// Errors from query validation.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query is empty")]
    Empty,
}

// ═══════════════════════════════════════════════════════════
// Static lookup tables
// ═══════════════════════════════════════════════════════════

/// Device-name synonyms, keyed by the lowercased user phrase.
const DEVICE_SYNONYMS: &[(&str, &[&str])] = &[
    ("insulin pump", &["insulin infusion pump", "continuous subcutaneous insulin infusion"]),
    ("pacemaker", &["cardiac pacemaker", "implantable pacemaker"]),
    ("stent", &["coronary stent", "vascular stent", "drug eluting stent"]),
    ("catheter", &["intravascular catheter", "central venous catheter", "urinary catheter"]),
    ("implant", &["medical implant", "surgical implant", "prosthetic implant"]),
    ("ventilator", &["mechanical ventilator", "respiratory ventilator"]),
    ("defibrillator", &["implantable defibrillator", "automated external defibrillator"]),
    ("hip replacement", &["total hip arthroplasty", "hip prosthesis", "hip implant"]),
    ("knee replacement", &["total knee arthroplasty", "knee prosthesis", "knee implant"]),
];

/// Canonical manufacturer names and the aliases that resolve to them.
const MANUFACTURER_ALIASES: &[(&str, &[&str])] = &[
    ("Medtronic plc", &["medtronic", "medtronic inc", "medtronic usa"]),
    ("Johnson & Johnson", &["johnson", "johnson and johnson", "j&j", "ethicon", "depuy"]),
    ("Abbott Laboratories", &["abbott", "abbott medical"]),
    ("Boston Scientific Corp", &["boston scientific", "bsc"]),
    ("Edwards Lifesciences", &["edwards", "edwards lifesciences corp"]),
    ("Stryker Corporation", &["stryker", "stryker corp"]),
    ("Zimmer Biomet", &["zimmer", "zimmer holdings"]),
];

// ═══════════════════════════════════════════════════════════
// Expansion
// ═══════════════════════════════════════════════════════════

/// Expand a raw user query into at most `max_variants` search variants.
///
/// The exact phrase is always first. Fails before any other work when the
/// trimmed input is empty — no network call may be attempted on malformed
/// input.
pub fn expand(raw_query: &str, max_variants: usize) -> Result<Vec<QueryVariant>, QueryError> {
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        return Err(QueryError::Empty);
    }
    let lowered = trimmed.to_lowercase();

    let mut variants = vec![QueryVariant {
        text: trimmed.to_string(),
        kind: VariantKind::Exact,
    }];

    if let Some(canonical) = canonical_manufacturer(&lowered) {
        if !canonical.eq_ignore_ascii_case(trimmed) {
            variants.push(QueryVariant {
                text: canonical.to_string(),
                kind: VariantKind::ManufacturerNormalized,
            });
        }
    }

    // A trailing wildcard only helps on a single token; the upstream does
    // not wildcard inside phrases. Very short stems match too much.
    if !trimmed.contains(' ') && trimmed.chars().count() > 3 && !trimmed.contains('*') {
        variants.push(QueryVariant {
            text: format!("{trimmed}*"),
            kind: VariantKind::Wildcard,
        });
    }

    if let Some((_, synonyms)) = DEVICE_SYNONYMS.iter().find(|(key, _)| *key == lowered) {
        for synonym in *synonyms {
            variants.push(QueryVariant {
                text: synonym.to_string(),
                kind: VariantKind::Synonym,
            });
        }
    }

    variants.truncate(max_variants.max(1));
    Ok(variants)
}

/// Resolve a lowercased query to a canonical manufacturer name, if it
/// matches a known alias or the canonical name itself.
fn canonical_manufacturer(lowered: &str) -> Option<&'static str> {
    MANUFACTURER_ALIASES
        .iter()
        .find(|(canonical, aliases)| {
            canonical.to_lowercase() == lowered || aliases.contains(&lowered)
        })
        .map(|(canonical, _)| *canonical)
}

/// Normalize a manufacturer name for cross-source comparison: lowercase,
/// punctuation stripped, corporate suffixes removed, whitespace collapsed.
///
/// "Medtronic MiniMed, Inc." and "MEDTRONIC MINIMED" must compare equal —
/// the same firm appears under different registrations in different
/// datasets.
pub fn normalize_manufacturer(name: &str) -> String {
    static PUNCT: OnceLock<regex::Regex> = OnceLock::new();
    static SUFFIX: OnceLock<regex::Regex> = OnceLock::new();
    let punct = PUNCT.get_or_init(|| regex::Regex::new(r"[^a-z0-9\s]").unwrap());
    let suffix = SUFFIX.get_or_init(|| {
        regex::Regex::new(
            r"\b(incorporated|corporation|laboratories|company|limited|holdings|inc|corp|labs|ltd|llc|plc|gmbh|usa|co)\b",
        )
        .unwrap()
    });

    let lowered = name.to_lowercase().replace('&', " and ");
    let stripped = punct.replace_all(&lowered, " ");
    let stripped = suffix.replace_all(&stripped, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_rejected() {
        assert!(matches!(expand("", 8), Err(QueryError::Empty)));
        assert!(matches!(expand("   \t ", 8), Err(QueryError::Empty)));
    }

    #[test]
    fn exact_variant_always_comes_first() {
        for input in ["insulin pump", "x", "some novel device nobody indexed"] {
            let variants = expand(input, 8).unwrap();
            assert!(!variants.is_empty());
            assert_eq!(variants[0].kind, VariantKind::Exact);
            assert_eq!(variants[0].text, input);
        }
    }

    #[test]
    fn multiword_queries_get_no_wildcard() {
        let variants = expand("insulin pump", 8).unwrap();
        assert!(variants.iter().all(|v| v.kind != VariantKind::Wildcard));
    }

    #[test]
    fn single_word_gets_trailing_wildcard() {
        let variants = expand("pacemaker", 8).unwrap();
        let wildcard = variants
            .iter()
            .find(|v| v.kind == VariantKind::Wildcard)
            .expect("wildcard variant");
        assert_eq!(wildcard.text, "pacemaker*");
    }

    #[test]
    fn short_terms_get_no_wildcard() {
        let variants = expand("ICD", 8).unwrap();
        assert!(variants.iter().all(|v| v.kind != VariantKind::Wildcard));
    }

    #[test]
    fn stem_length_counts_characters_not_bytes() {
        // Two characters, six bytes — still a short stem.
        let variants = expand("脈波", 8).unwrap();
        assert!(variants.iter().all(|v| v.kind != VariantKind::Wildcard));
        // Four characters earn the wildcard regardless of encoding width.
        let variants = expand("müll", 8).unwrap();
        assert!(variants.iter().any(|v| v.kind == VariantKind::Wildcard));
    }

    #[test]
    fn synonyms_are_appended_last() {
        let variants = expand("insulin pump", 8).unwrap();
        let synonyms: Vec<_> = variants
            .iter()
            .filter(|v| v.kind == VariantKind::Synonym)
            .collect();
        assert_eq!(synonyms.len(), 2);
        assert_eq!(synonyms[0].text, "insulin infusion pump");
        // All synonyms sit after the exact variant
        assert_eq!(variants.last().unwrap().kind, VariantKind::Synonym);
    }

    #[test]
    fn manufacturer_alias_resolves_to_canonical() {
        let variants = expand("medtronic", 8).unwrap();
        let normalized = variants
            .iter()
            .find(|v| v.kind == VariantKind::ManufacturerNormalized)
            .expect("manufacturer variant");
        assert_eq!(normalized.text, "Medtronic plc");
        // Canonical itself gains no duplicate variant
        let variants = expand("Medtronic plc", 8).unwrap();
        assert!(variants
            .iter()
            .all(|v| v.kind != VariantKind::ManufacturerNormalized));
    }

    #[test]
    fn cap_truncates_from_the_tail() {
        let full = expand("stent", 8).unwrap();
        let capped = expand("stent", 3).unwrap();
        assert_eq!(capped.len(), 3);
        assert_eq!(capped[..], full[..3]);
        assert_eq!(capped[0].kind, VariantKind::Exact);
    }

    #[test]
    fn cap_of_zero_still_yields_the_exact_variant() {
        let variants = expand("stent", 0).unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].kind, VariantKind::Exact);
    }

    #[test]
    fn priority_order_is_exact_mfr_wildcard_synonym() {
        let variants = expand("stent", 8).unwrap();
        let kinds: Vec<_> = variants.iter().map(|v| v.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted, "variants must be emitted in priority order");
    }

    #[test]
    fn normalize_strips_suffixes_and_punctuation() {
        assert_eq!(
            normalize_manufacturer("Medtronic MiniMed, Inc."),
            "medtronic minimed",
        );
        assert_eq!(
            normalize_manufacturer("MEDTRONIC MINIMED"),
            "medtronic minimed",
        );
        assert_eq!(
            normalize_manufacturer("Johnson & Johnson"),
            "johnson and johnson",
        );
        assert_eq!(
            normalize_manufacturer("Boston Scientific Corporation"),
            "boston scientific",
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_manufacturer("Abbott Laboratories, Inc.");
        assert_eq!(normalize_manufacturer(&once), once);
    }
}
