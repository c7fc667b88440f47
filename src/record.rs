//! Typed records for the six openFDA device datasets.
//!
//! Upstream responses are loosely-typed JSON with per-dataset field sets and
//! a handful of quirks: MAUDE nests device and patient data in arrays, UDI
//! buries the primary device identifier in an `identifiers[]` list, dates
//! arrive as either `YYYY-MM-DD` or `YYYYMMDD`, and some enrichment lives
//! under an `openfda` sub-object. Everything is converted to a strongly
//! typed [`RawRecord`] at the fetch boundary so downstream code never
//! branches on untyped maps.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::source::SourceKind;

// ═══════════════════════════════════════════════════════════
// Record types — one variant per dataset
// ═══════════════════════════════════════════════════════════

/// One record from one openFDA dataset, immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    Clearance(Clearance510k),
    Approval(PmaApproval),
    Event(AdverseEvent),
    Recall(RecallNotice),
    Classification(DeviceClassification),
    Udi(UdiEntry),
}

/// A 510(k) premarket notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clearance510k {
    pub k_number: String,
    pub device_name: Option<String>,
    pub applicant: Option<String>,
    pub decision_date: Option<NaiveDate>,
    pub decision_description: Option<String>,
    pub product_code: Option<String>,
    pub clearance_type: Option<String>,
}

/// A PMA approval or supplement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmaApproval {
    pub pma_number: String,
    pub supplement_number: Option<String>,
    pub trade_name: Option<String>,
    pub generic_name: Option<String>,
    pub applicant: Option<String>,
    pub decision_date: Option<NaiveDate>,
    pub supplement_reason: Option<String>,
    pub product_code: Option<String>,
}

/// A MAUDE adverse event report, flattened from its nested device and
/// patient arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdverseEvent {
    pub report_number: String,
    pub event_type: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub date_of_event: Option<NaiveDate>,
    pub manufacturer_name: Option<String>,
    pub brand_name: Option<String>,
    pub generic_name: Option<String>,
    pub product_code: Option<String>,
    pub product_problems: Vec<String>,
    pub adverse_event_flag: Option<String>,
    pub patient_outcomes: Vec<String>,
    pub remedial_action: Option<String>,
}

/// A device recall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallNotice {
    pub recall_number: String,
    pub event_date_initiated: Option<NaiveDate>,
    pub recalling_firm: Option<String>,
    pub product_description: Option<String>,
    /// Raw classification string, e.g. "Class I" — parsed lazily for scoring.
    pub recall_classification: Option<String>,
    pub reason_for_recall: Option<String>,
    pub recall_status: Option<String>,
    pub product_code: Option<String>,
    /// 510(k) numbers the recall explicitly references. Basis for exact
    /// cross-source links.
    pub k_numbers: Vec<String>,
}

/// A product-code classification record. Undated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceClassification {
    pub product_code: String,
    pub device_name: Option<String>,
    pub device_class: Option<String>,
    pub medical_specialty_description: Option<String>,
    pub regulation_number: Option<String>,
}

/// A GUDID device entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdiEntry {
    pub record_key: String,
    /// Primary device identifier, when present in `identifiers[]`.
    pub device_identifier: Option<String>,
    pub brand_name: Option<String>,
    pub device_description: Option<String>,
    pub company_name: Option<String>,
    pub version_or_model_number: Option<String>,
    pub device_status: Option<String>,
    pub publish_date: Option<NaiveDate>,
}

// ═══════════════════════════════════════════════════════════
// Conversion at the fetch boundary
// ═══════════════════════════════════════════════════════════

impl RawRecord {
    /// Convert one upstream result object into a typed record.
    ///
    /// Returns `None` when the dataset's primary key is missing — such
    /// records cannot participate in deduplication and are dropped.
    pub fn from_value(source: SourceKind, value: &Value) -> Option<RawRecord> {
        match source {
            SourceKind::Premarket510k => Some(RawRecord::Clearance(Clearance510k {
                k_number: str_field(value, "k_number")?,
                device_name: opt_str(value, "device_name"),
                applicant: opt_str(value, "applicant"),
                decision_date: date(value, "decision_date"),
                decision_description: opt_str(value, "decision_description"),
                product_code: opt_str(value, "product_code"),
                clearance_type: opt_str(value, "clearance_type"),
            })),
            SourceKind::Pma => Some(RawRecord::Approval(PmaApproval {
                pma_number: str_field(value, "pma_number")?,
                supplement_number: opt_str(value, "supplement_number"),
                trade_name: opt_str(value, "trade_name"),
                generic_name: opt_str(value, "generic_name"),
                applicant: opt_str(value, "applicant"),
                decision_date: date(value, "decision_date"),
                supplement_reason: opt_str(value, "supplement_reason"),
                product_code: opt_str(value, "product_code"),
            })),
            SourceKind::Event => {
                // Device details sit in the first entry of a nested array;
                // outcomes are scattered across the patient array.
                let device = value.get("device").and_then(|d| d.as_array()).and_then(|a| a.first());
                let outcomes = value
                    .get("patient")
                    .and_then(|p| p.as_array())
                    .map(|patients| {
                        patients
                            .iter()
                            .flat_map(|p| string_list(p, "sequence_number_outcome"))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(RawRecord::Event(AdverseEvent {
                    report_number: str_field(value, "report_number")?,
                    event_type: opt_str(value, "event_type"),
                    date_received: date(value, "date_received"),
                    date_of_event: date(value, "date_of_event"),
                    manufacturer_name: opt_str(value, "manufacturer_d_name")
                        .or_else(|| opt_str(value, "manufacturer_name")),
                    brand_name: device.and_then(|d| opt_str(d, "brand_name")),
                    generic_name: device.and_then(|d| opt_str(d, "generic_name")),
                    product_code: device.and_then(|d| opt_str(d, "device_report_product_code")),
                    product_problems: string_list(value, "product_problems"),
                    adverse_event_flag: opt_str(value, "adverse_event_flag"),
                    patient_outcomes: outcomes,
                    remedial_action: string_list(value, "remedial_action").into_iter().next(),
                }))
            }
            SourceKind::Recall => Some(RawRecord::Recall(RecallNotice {
                recall_number: str_field(value, "recall_number")?,
                event_date_initiated: date(value, "event_date_initiated")
                    .or_else(|| date(value, "recall_initiation_date")),
                recalling_firm: opt_str(value, "recalling_firm"),
                product_description: opt_str(value, "product_description"),
                recall_classification: opt_str(value, "recall_classification")
                    .or_else(|| opt_str(value, "classification")),
                reason_for_recall: opt_str(value, "reason_for_recall"),
                recall_status: opt_str(value, "recall_status"),
                product_code: opt_str(value, "product_code"),
                k_numbers: string_list(value, "k_numbers"),
            })),
            SourceKind::Classification => Some(RawRecord::Classification(DeviceClassification {
                product_code: str_field(value, "product_code")?,
                device_name: opt_str(value, "device_name"),
                device_class: opt_str(value, "device_class")
                    .or_else(|| opt_str_path(value, "openfda", "device_class")),
                medical_specialty_description: opt_str(value, "medical_specialty_description"),
                regulation_number: opt_str(value, "regulation_number")
                    .or_else(|| opt_str_path(value, "openfda", "regulation_number")),
            })),
            SourceKind::Udi => {
                let primary_di = value
                    .get("identifiers")
                    .and_then(|ids| ids.as_array())
                    .and_then(|ids| {
                        ids.iter()
                            .find(|id| opt_str(id, "type").as_deref() == Some("Primary"))
                            .and_then(|id| opt_str(id, "id"))
                    });
                // Fall back to the primary DI as record identity when the
                // record key is absent (older GUDID exports).
                let record_key = str_field(value, "public_device_record_key")
                    .or_else(|| primary_di.clone())?;
                Some(RawRecord::Udi(UdiEntry {
                    record_key,
                    device_identifier: primary_di,
                    brand_name: opt_str(value, "brand_name"),
                    device_description: opt_str(value, "device_description"),
                    company_name: opt_str(value, "company_name"),
                    version_or_model_number: opt_str(value, "version_or_model_number"),
                    device_status: opt_str(value, "device_status"),
                    publish_date: date(value, "publish_date"),
                }))
            }
        }
    }

    /// Which dataset this record came from.
    pub fn source(&self) -> SourceKind {
        match self {
            RawRecord::Clearance(_) => SourceKind::Premarket510k,
            RawRecord::Approval(_) => SourceKind::Pma,
            RawRecord::Event(_) => SourceKind::Event,
            RawRecord::Recall(_) => SourceKind::Recall,
            RawRecord::Classification(_) => SourceKind::Classification,
            RawRecord::Udi(_) => SourceKind::Udi,
        }
    }

    /// The record's dedup identity within its dataset.
    pub fn record_id(&self) -> String {
        match self {
            RawRecord::Clearance(r) => r.k_number.clone(),
            // Supplements are distinct records sharing the parent number.
            RawRecord::Approval(r) => match &r.supplement_number {
                Some(s) if !s.is_empty() => format!("{}/{}", r.pma_number, s),
                _ => r.pma_number.clone(),
            },
            RawRecord::Event(r) => r.report_number.clone(),
            RawRecord::Recall(r) => r.recall_number.clone(),
            RawRecord::Classification(r) => r.product_code.clone(),
            RawRecord::Udi(r) => r.record_key.clone(),
        }
    }

    /// The record's primary date, if the dataset carries one.
    pub fn event_date(&self) -> Option<NaiveDate> {
        match self {
            RawRecord::Clearance(r) => r.decision_date,
            RawRecord::Approval(r) => r.decision_date,
            RawRecord::Event(r) => r.date_received,
            RawRecord::Recall(r) => r.event_date_initiated,
            RawRecord::Classification(_) => None,
            RawRecord::Udi(r) => r.publish_date,
        }
    }

    /// The manufacturer / applicant / firm name, if present.
    pub fn manufacturer(&self) -> Option<&str> {
        match self {
            RawRecord::Clearance(r) => r.applicant.as_deref(),
            RawRecord::Approval(r) => r.applicant.as_deref(),
            RawRecord::Event(r) => r.manufacturer_name.as_deref(),
            RawRecord::Recall(r) => r.recalling_firm.as_deref(),
            RawRecord::Classification(_) => None,
            RawRecord::Udi(r) => r.company_name.as_deref(),
        }
    }

    /// The FDA product code, if present.
    pub fn product_code(&self) -> Option<&str> {
        match self {
            RawRecord::Clearance(r) => r.product_code.as_deref(),
            RawRecord::Approval(r) => r.product_code.as_deref(),
            RawRecord::Event(r) => r.product_code.as_deref(),
            RawRecord::Recall(r) => r.product_code.as_deref(),
            RawRecord::Classification(r) => Some(&r.product_code),
            // GUDID nests product codes in a structure the fetcher does not
            // flatten; absence is fine for correlation purposes.
            RawRecord::Udi(_) => None,
        }
    }

    /// One-line description for timeline display.
    pub fn timeline_title(&self) -> String {
        match self {
            RawRecord::Clearance(r) => format!(
                "510(k) clearance: {} by {}",
                r.device_name.as_deref().unwrap_or("device"),
                r.applicant.as_deref().unwrap_or("unknown applicant"),
            ),
            RawRecord::Approval(r) => format!(
                "PMA approval: {} by {}",
                r.trade_name.as_deref().unwrap_or("device"),
                r.applicant.as_deref().unwrap_or("unknown applicant"),
            ),
            RawRecord::Event(r) => {
                let problem = r
                    .product_problems
                    .first()
                    .map(String::as_str)
                    .unwrap_or("adverse event");
                format!("Adverse event: {}", truncate(problem, 60))
            }
            RawRecord::Recall(r) => format!(
                "{} recall: {}",
                r.recall_classification.as_deref().unwrap_or("Unclassified"),
                truncate(r.reason_for_recall.as_deref().unwrap_or("unspecified reason"), 60),
            ),
            RawRecord::Classification(r) => format!(
                "Classification: {} ({})",
                r.device_name.as_deref().unwrap_or("device"),
                r.product_code,
            ),
            RawRecord::Udi(r) => format!(
                "UDI entry: {} by {}",
                r.brand_name.as_deref().unwrap_or("device"),
                r.company_name.as_deref().unwrap_or("unknown company"),
            ),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// SourceResult and DateRange
// ═══════════════════════════════════════════════════════════

/// All records retrieved for one (query, source) pair.
///
/// Records are unique by their dedup identity — the fetcher enforces this
/// as pages arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: SourceKind,
    pub records: Vec<RawRecord>,
    /// Total match count reported by the upstream, which may exceed the
    /// number of records actually fetched.
    pub total_matched: u64,
    pub fetched_at: DateTime<Utc>,
}

/// Inclusive date bounds applied to dated records. Undated records
/// (classification) always pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    /// Records on or after `from`.
    pub fn since(from: NaiveDate) -> Self {
        Self { from: Some(from), to: None }
    }

    /// Whether a record date (or lack of one) falls inside the range.
    pub fn admits(&self, date: Option<NaiveDate>) -> bool {
        let Some(d) = date else { return true };
        if let Some(from) = self.from {
            if d < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if d > to {
                return false;
            }
        }
        true
    }
}

// ═══════════════════════════════════════════════════════════
// JSON helpers
// ═══════════════════════════════════════════════════════════

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    str_field(value, key)
}

fn opt_str_path(value: &Value, outer: &str, key: &str) -> Option<String> {
    value.get(outer).and_then(|v| str_field(v, key))
}

/// Some fields arrive as a string in one dataset and a string array in
/// another; normalize both to a list.
fn string_list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Parse the two date layouts the upstream emits.
pub(crate) fn parse_fda_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

fn date(value: &Value, key: &str) -> Option<NaiveDate> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(parse_fda_date)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}…")
    }
}
