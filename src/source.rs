//! The six openFDA device datasets and their per-source metadata.
//!
//! Everything source-specific the fetcher needs — endpoint path, search
//! fields, date field, page cap, sort order — hangs off `SourceKind` so the
//! rest of the pipeline never branches on strings.

use serde::{Deserialize, Serialize};

/// One of the six openFDA device datasets.
///
/// Variant order doubles as the canonical sort order for cache keys and
/// result maps; safety relevance for timeline tie-breaks is separate
/// (see [`SourceKind::safety_priority`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 510(k) premarket notifications (clearances).
    #[serde(rename = "510k")]
    Premarket510k,
    /// Premarket approvals and their supplements.
    Pma,
    /// MAUDE adverse event reports.
    Event,
    /// Device recalls.
    Recall,
    /// Product-code classification records.
    Classification,
    /// Unique Device Identification (GUDID) entries.
    Udi,
}

impl SourceKind {
    /// All six datasets, in canonical order.
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Premarket510k,
        SourceKind::Pma,
        SourceKind::Event,
        SourceKind::Recall,
        SourceKind::Classification,
        SourceKind::Udi,
    ];

    /// The dataset's short name as used in endpoint paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Premarket510k => "510k",
            SourceKind::Pma => "pma",
            SourceKind::Event => "event",
            SourceKind::Recall => "recall",
            SourceKind::Classification => "classification",
            SourceKind::Udi => "udi",
        }
    }

    /// Endpoint file under the API root, e.g. `510k.json`.
    pub fn endpoint(&self) -> String {
        format!("{}.json", self.as_str())
    }

    /// The field that uniquely identifies a record within this dataset.
    /// PMA supplements share a `pma_number`, so the supplement number is
    /// folded into the identity (see `RawRecord::record_id`).
    pub fn primary_key_field(&self) -> &'static str {
        match self {
            SourceKind::Premarket510k => "k_number",
            SourceKind::Pma => "pma_number",
            SourceKind::Event => "report_number",
            SourceKind::Recall => "recall_number",
            SourceKind::Classification => "product_code",
            SourceKind::Udi => "public_device_record_key",
        }
    }

    /// The date field used for sorting and date-range filtering.
    /// Classification records are undated.
    pub fn date_field(&self) -> Option<&'static str> {
        match self {
            SourceKind::Premarket510k | SourceKind::Pma => Some("decision_date"),
            SourceKind::Event => Some("date_received"),
            SourceKind::Recall => Some("event_date_initiated"),
            SourceKind::Classification => None,
            SourceKind::Udi => Some("publish_date"),
        }
    }

    /// Full-text fields searched for this dataset, device and manufacturer
    /// names combined. These are the fields the upstream actually indexes —
    /// several documented ones silently match nothing.
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Premarket510k => &["device_name", "applicant"],
            SourceKind::Pma => &["trade_name", "generic_name", "applicant"],
            SourceKind::Event => &["device.brand_name", "device.generic_name", "manufacturer_d_name"],
            SourceKind::Recall => &["product_description", "recalling_firm"],
            SourceKind::Classification => &["device_name", "medical_specialty_description"],
            SourceKind::Udi => &["brand_name", "device_description", "company_name"],
        }
    }

    /// Upstream page-size cap for this dataset. MAUDE caps lower than the
    /// other endpoints.
    pub fn page_limit(&self) -> usize {
        match self {
            SourceKind::Event => 100,
            _ => 1000,
        }
    }

    /// Tie-break rank for same-date timeline entries: lower sorts first.
    /// Safety relevance ordering — a recall outranks an adverse event
    /// outranks regulatory paperwork.
    pub fn safety_priority(&self) -> u8 {
        match self {
            SourceKind::Recall => 0,
            SourceKind::Event => 1,
            SourceKind::Premarket510k => 2,
            SourceKind::Pma => 3,
            SourceKind::Classification => 4,
            SourceKind::Udi => 5,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Premarket510k => write!(f, "510(k)"),
            SourceKind::Pma => write!(f, "PMA"),
            SourceKind::Event => write!(f, "adverse event"),
            SourceKind::Recall => write!(f, "recall"),
            SourceKind::Classification => write!(f, "classification"),
            SourceKind::Udi => write!(f, "UDI"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_use_short_names() {
        assert_eq!(SourceKind::Premarket510k.endpoint(), "510k.json");
        assert_eq!(SourceKind::Udi.endpoint(), "udi.json");
    }

    #[test]
    fn serde_uses_openfda_dataset_names() {
        let json = serde_json::to_string(&SourceKind::Premarket510k).unwrap();
        assert_eq!(json, "\"510k\"");
        let back: SourceKind = serde_json::from_str("\"classification\"").unwrap();
        assert_eq!(back, SourceKind::Classification);
    }

    #[test]
    fn classification_is_undated() {
        assert!(SourceKind::Classification.date_field().is_none());
        for kind in SourceKind::ALL {
            if kind != SourceKind::Classification {
                assert!(kind.date_field().is_some(), "{kind} should be dated");
            }
        }
    }

    #[test]
    fn safety_priority_ranks_recall_first() {
        let mut ranked = SourceKind::ALL.to_vec();
        ranked.sort_by_key(|k| k.safety_priority());
        assert_eq!(ranked[0], SourceKind::Recall);
        assert_eq!(ranked[1], SourceKind::Event);
        assert_eq!(ranked[5], SourceKind::Udi);
    }

    #[test]
    fn event_pages_are_smaller() {
        assert_eq!(SourceKind::Event.page_limit(), 100);
        assert_eq!(SourceKind::Recall.page_limit(), 1000);
    }

    #[test]
    fn every_source_has_search_fields() {
        for kind in SourceKind::ALL {
            assert!(!kind.search_fields().is_empty());
        }
    }
}
