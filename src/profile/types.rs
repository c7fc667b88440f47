use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::{
    AdverseEvent, Clearance510k, DeviceClassification, PmaApproval, RecallNotice, UdiEntry,
};
use crate::source::SourceKind;

/// The correlated cross-source view of one device or manufacturer lineage.
///
/// Exists only for the duration of a query — the cache stores retrievals,
/// not profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// The query this profile was built for.
    pub query: String,
    /// Every manufacturer / applicant / firm name seen, as reported.
    pub manufacturers: BTreeSet<String>,
    /// Every FDA product code seen.
    pub product_codes: BTreeSet<String>,
    pub clearances: Vec<Clearance510k>,
    pub approvals: Vec<PmaApproval>,
    pub adverse_events: Vec<AdverseEvent>,
    pub recalls: Vec<RecallNotice>,
    pub classifications: Vec<DeviceClassification>,
    pub udi_entries: Vec<UdiEntry>,
    /// Derived risk score in [0, 100], deterministic for a given record set.
    pub risk_score: f64,
    /// All dated events across all sources, ascending by date.
    pub timeline: Vec<TimelineEntry>,
    /// Best-effort cross-source links. False links from coincidental
    /// name+date overlap are an accepted, bounded error mode.
    pub links: Vec<CrossSourceLink>,
}

impl DeviceProfile {
    pub(crate) fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            manufacturers: BTreeSet::new(),
            product_codes: BTreeSet::new(),
            clearances: Vec::new(),
            approvals: Vec::new(),
            adverse_events: Vec::new(),
            recalls: Vec::new(),
            classifications: Vec::new(),
            udi_entries: Vec::new(),
            risk_score: 0.0,
            timeline: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Total records across all sources.
    pub fn total_records(&self) -> usize {
        self.clearances.len()
            + self.approvals.len()
            + self.adverse_events.len()
            + self.recalls.len()
            + self.classifications.len()
            + self.udi_entries.len()
    }

    /// Structured rollup for display and prompting. `as_of` anchors the
    /// recent-activity window so the summary stays reproducible.
    pub fn summary(&self, as_of: NaiveDate) -> RegulatorySummary {
        let window_start = as_of - chrono::Duration::days(90);
        RegulatorySummary {
            total_clearances: self.clearances.len(),
            total_approvals: self.approvals.len(),
            total_recalls: self.recalls.len(),
            total_adverse_events: self.adverse_events.len(),
            class_i_recalls: self
                .recalls
                .iter()
                .filter(|r| {
                    r.recall_classification
                        .as_deref()
                        .and_then(super::risk::parse_recall_class)
                        == Some(super::risk::RecallClass::I)
                })
                .count(),
            serious_adverse_events: self
                .adverse_events
                .iter()
                .filter(|e| e.adverse_event_flag.as_deref() == Some("Y"))
                .count(),
            events_last_90_days: self
                .timeline
                .iter()
                .filter(|e| e.date > window_start && e.date <= as_of)
                .count(),
            risk_score: self.risk_score,
        }
    }
}

/// One dated event on the consolidated timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub source: SourceKind,
    pub description: String,
}

/// A link between two records from different sources believed to describe
/// the same device lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSourceLink {
    pub source_a: SourceKind,
    pub record_a: String,
    pub source_b: SourceKind,
    pub record_b: String,
    pub reason: LinkReason,
}

/// Why two records were linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkReason {
    /// One record explicitly references the other's identifier (a recall
    /// listing a k_number).
    SharedIdentifier,
    /// Same normalized manufacturer within the date proximity window.
    ManufacturerDateProximity { days_apart: i64 },
}

/// Counted rollup of a profile's regulatory history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatorySummary {
    pub total_clearances: usize,
    pub total_approvals: usize,
    pub total_recalls: usize,
    pub total_adverse_events: usize,
    pub class_i_recalls: usize,
    pub serious_adverse_events: usize,
    pub events_last_90_days: usize,
    pub risk_score: f64,
}
