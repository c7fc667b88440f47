//! Cross-source record linking.
//!
//! Two tiers, strongest first: explicit identifier references (a recall
//! listing the 510(k) numbers it affects) and the manufacturer+date
//! heuristic (same normalized firm name, dates within the configured
//! window). Heuristic links can be wrong when large manufacturers have
//! unrelated filings close together; consumers treat them as leads, not
//! facts.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::query::normalize_manufacturer;
use crate::source::SourceKind;

use super::types::{CrossSourceLink, DeviceProfile, LinkReason};

/// A record's linkable identity: where it came from, its id, and the
/// fields the heuristics compare.
struct LinkCandidate<'a> {
    source: SourceKind,
    id: &'a str,
    manufacturer: Option<&'a str>,
    date: Option<NaiveDate>,
}

/// Build cross-source links for `profile`.
///
/// Safety records (recalls, adverse events) are linked against regulatory
/// records (clearances, approvals). The output is deterministic: candidates
/// are walked in stored order and duplicate pairs are suppressed.
pub(crate) fn link_records(profile: &DeviceProfile, window_days: i64) -> Vec<CrossSourceLink> {
    let safety: Vec<LinkCandidate<'_>> = profile
        .recalls
        .iter()
        .map(|r| LinkCandidate {
            source: SourceKind::Recall,
            id: &r.recall_number,
            manufacturer: r.recalling_firm.as_deref(),
            date: r.event_date_initiated,
        })
        .chain(profile.adverse_events.iter().map(|e| LinkCandidate {
            source: SourceKind::Event,
            id: &e.report_number,
            manufacturer: e.manufacturer_name.as_deref(),
            date: e.date_received,
        }))
        .collect();

    let regulatory: Vec<LinkCandidate<'_>> = profile
        .clearances
        .iter()
        .map(|c| LinkCandidate {
            source: SourceKind::Premarket510k,
            id: &c.k_number,
            manufacturer: c.applicant.as_deref(),
            date: c.decision_date,
        })
        .chain(profile.approvals.iter().map(|a| LinkCandidate {
            source: SourceKind::Pma,
            id: &a.pma_number,
            manufacturer: a.applicant.as_deref(),
            date: a.decision_date,
        }))
        .collect();

    let mut links = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    // Explicit references beat heuristics, so they claim pairs first.
    for recall in &profile.recalls {
        for k_number in &recall.k_numbers {
            for clearance in &profile.clearances {
                if clearance.k_number == *k_number {
                    push_link(
                        &mut seen,
                        &mut links,
                        SourceKind::Recall,
                        &recall.recall_number,
                        SourceKind::Premarket510k,
                        &clearance.k_number,
                        LinkReason::SharedIdentifier,
                    );
                }
            }
        }
    }

    for a in &safety {
        for b in &regulatory {
            let (Some(m_a), Some(m_b)) = (a.manufacturer, b.manufacturer) else {
                continue;
            };
            if normalize_manufacturer(m_a) != normalize_manufacturer(m_b) {
                continue;
            }
            let (Some(d_a), Some(d_b)) = (a.date, b.date) else {
                continue;
            };
            let days_apart = (d_a - d_b).num_days().abs();
            if days_apart <= window_days {
                push_link(
                    &mut seen,
                    &mut links,
                    a.source,
                    a.id,
                    b.source,
                    b.id,
                    LinkReason::ManufacturerDateProximity { days_apart },
                );
            }
        }
    }

    links
}

fn push_link(
    seen: &mut HashSet<(String, String)>,
    links: &mut Vec<CrossSourceLink>,
    source_a: SourceKind,
    record_a: &str,
    source_b: SourceKind,
    record_b: &str,
    reason: LinkReason,
) {
    if seen.insert((record_a.to_string(), record_b.to_string())) {
        links.push(CrossSourceLink {
            source_a,
            record_a: record_a.to_string(),
            source_b,
            record_b: record_b.to_string(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Clearance510k, RecallNotice};

    fn clearance(k_number: &str, applicant: &str, date: (i32, u32, u32)) -> Clearance510k {
        Clearance510k {
            k_number: k_number.into(),
            device_name: None,
            applicant: Some(applicant.into()),
            decision_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            decision_description: None,
            product_code: None,
            clearance_type: None,
        }
    }

    fn recall(number: &str, firm: &str, date: (i32, u32, u32), k_numbers: &[&str]) -> RecallNotice {
        RecallNotice {
            recall_number: number.into(),
            event_date_initiated: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            recalling_firm: Some(firm.into()),
            product_description: None,
            recall_classification: Some("Class II".into()),
            reason_for_recall: None,
            recall_status: None,
            product_code: None,
            k_numbers: k_numbers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn explicit_k_number_reference_links() {
        let mut profile = DeviceProfile::empty("pump");
        profile.clearances.push(clearance("K111111", "Acme Medical, Inc.", (2020, 1, 1)));
        profile.recalls.push(recall("Z-1", "Unrelated Firm", (2025, 6, 1), &["K111111"]));

        let links = link_records(&profile, 90);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].reason, LinkReason::SharedIdentifier);
        assert_eq!(links[0].record_a, "Z-1");
        assert_eq!(links[0].record_b, "K111111");
    }

    #[test]
    fn manufacturer_and_date_proximity_links() {
        let mut profile = DeviceProfile::empty("pump");
        profile.clearances.push(clearance("K222222", "Acme Medical, Inc.", (2025, 5, 1)));
        profile.recalls.push(recall("Z-2", "ACME MEDICAL INC", (2025, 6, 1), &[]));

        let links = link_records(&profile, 90);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].reason,
            LinkReason::ManufacturerDateProximity { days_apart: 31 },
        );
    }

    #[test]
    fn dates_outside_the_window_do_not_link() {
        let mut profile = DeviceProfile::empty("pump");
        profile.clearances.push(clearance("K333333", "Acme Medical", (2020, 1, 1)));
        profile.recalls.push(recall("Z-3", "Acme Medical", (2025, 6, 1), &[]));
        assert!(link_records(&profile, 90).is_empty());
    }

    #[test]
    fn different_manufacturers_do_not_link() {
        let mut profile = DeviceProfile::empty("pump");
        profile.clearances.push(clearance("K444444", "Acme Medical", (2025, 5, 1)));
        profile.recalls.push(recall("Z-4", "Other Devices LLC", (2025, 5, 10), &[]));
        assert!(link_records(&profile, 90).is_empty());
    }

    #[test]
    fn explicit_link_suppresses_duplicate_heuristic_pair() {
        let mut profile = DeviceProfile::empty("pump");
        profile.clearances.push(clearance("K555555", "Acme Medical", (2025, 5, 1)));
        profile.recalls.push(recall("Z-5", "Acme Medical", (2025, 5, 15), &["K555555"]));

        let links = link_records(&profile, 90);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].reason, LinkReason::SharedIdentifier);
    }
}
