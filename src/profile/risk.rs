//! Deterministic risk scoring over a correlated profile.
//!
//! The score is a weighted tally clamped to [0, 100]. It orders profiles by
//! regulatory-history severity; it is not a clinical judgment and the docs
//! on [`DeviceProfile::risk_score`] say so.

use crate::config::RiskWeights;

use super::types::DeviceProfile;

/// FDA recall classification, parsed from the upstream's free-text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecallClass {
    I,
    II,
    III,
}

/// Parse strings like "Class I", "class ii", "III", or "2".
///
/// Matches the full normalized token, never a prefix — "Class III" must not
/// count as Class I.
pub(crate) fn parse_recall_class(raw: &str) -> Option<RecallClass> {
    let upper = raw.trim().to_uppercase();
    let token = upper.strip_prefix("CLASS").unwrap_or(&upper).trim();
    match token {
        "I" | "1" => Some(RecallClass::I),
        "II" | "2" => Some(RecallClass::II),
        "III" | "3" => Some(RecallClass::III),
        _ => None,
    }
}

/// Whether a classification record's device class is III.
fn is_class_iii(device_class: &str) -> bool {
    matches!(device_class.trim(), "3" | "III" | "iii")
}

/// Compute the weighted risk score for `profile`.
///
/// Unclassified recalls score at the Class III (least severe) weight. The
/// Class III device contribution applies at most once no matter how many
/// classification records repeat it.
pub(crate) fn score(profile: &DeviceProfile, weights: &RiskWeights) -> f64 {
    let mut total = 0.0;

    for recall in &profile.recalls {
        let class = recall
            .recall_classification
            .as_deref()
            .and_then(parse_recall_class);
        total += match class {
            Some(RecallClass::I) => weights.class_i_recall,
            Some(RecallClass::II) => weights.class_ii_recall,
            Some(RecallClass::III) | None => weights.class_iii_recall,
        };
    }

    total += profile.adverse_events.len() as f64 * weights.adverse_event;

    let any_class_iii = profile
        .classifications
        .iter()
        .any(|c| c.device_class.as_deref().is_some_and(is_class_iii));
    if any_class_iii {
        total += weights.class_iii_device;
    }

    let regulatory = profile.clearances.len() + profile.approvals.len();
    total += regulatory as f64 * weights.regulatory_activity;

    total.clamp(0.0, 100.0)
}
