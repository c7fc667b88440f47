//! Bounded prompt assembly from a correlated profile.
//!
//! The prompt is the only thing the language model sees, so it carries the
//! counts, the risk score, and a capped sample of records per source —
//! never the full record set. Samples are taken from the front of each
//! already-ordered vector, keeping the prompt deterministic for a given
//! profile.

use serde_json::{json, Value};

use crate::profile::DeviceProfile;

/// Records included per source: safety datasets sample fewer because their
/// records are long.
const SAFETY_SAMPLE_CAP: usize = 5;
const DEFAULT_SAMPLE_CAP: usize = 8;

/// System instructions. The verification step guards against the model
/// narrating data that does not mention the queried device at all.
pub const SYSTEM_PROMPT: &str = "\
You are a helpful assistant analyzing FDA medical device data samples. Your \
goal is to summarize potential points of interest in simple, clear language \
for a non-expert audience.

VERIFICATION STEP - REQUIRED:
1. First, carefully check if the device or manufacturer mentioned in the \
query is actually present in the sample records provided below.
2. If the exact name is NOT found in the sample data, respond ONLY with: \
\"No specific data for '[query]' was found in this data sample.\"
3. DO NOT provide insights about unrelated topics if the query subject \
isn't in the data.

If (and only if) the query subject IS found in the data, analyze the sample \
records and provide a brief summary.

FORMAT YOUR RESPONSE EXACTLY AS FOLLOWS (use these headers with a blank \
line between sections):

MAIN OBSERVATION:
[1-2 sentences describing the most noticeable point in this data sample. \
Mention counts or dates where helpful.]

WHAT THIS MIGHT MEAN:
[1-2 sentences explaining the potential significance in simple terms. \
Avoid jargon.]

OTHER DETAILS:
[1-2 sentences on any secondary points or patterns in the sample.]

IMPORTANT NOTE:
[1 sentence reminding the reader that this analysis covers only the small \
sample of records provided and is not medical or legal advice.]

Keep the entire response concise, around 100-150 words.";

/// Build the user prompt for `profile`.
pub fn build_prompt(profile: &DeviceProfile) -> String {
    let sections = [
        section("recalls", profile.recalls.len(), sample(&profile.recalls, SAFETY_SAMPLE_CAP)),
        section(
            "adverse_events",
            profile.adverse_events.len(),
            sample(&profile.adverse_events, SAFETY_SAMPLE_CAP),
        ),
        section(
            "510k_clearances",
            profile.clearances.len(),
            sample(&profile.clearances, DEFAULT_SAMPLE_CAP),
        ),
        section(
            "pma_approvals",
            profile.approvals.len(),
            sample(&profile.approvals, DEFAULT_SAMPLE_CAP),
        ),
        section(
            "classifications",
            profile.classifications.len(),
            sample(&profile.classifications, DEFAULT_SAMPLE_CAP),
        ),
        section(
            "udi_entries",
            profile.udi_entries.len(),
            sample(&profile.udi_entries, DEFAULT_SAMPLE_CAP),
        ),
    ];

    let date_range = match (profile.timeline.first(), profile.timeline.last()) {
        (Some(first), Some(last)) => format!("{} to {}", first.date, last.date),
        _ => "N/A".to_string(),
    };

    let data = json!({
        "query": profile.query,
        "total_records": profile.total_records(),
        "risk_score": profile.risk_score,
        "manufacturers": profile.manufacturers,
        "date_range": date_range,
        "sections": Value::Array(sections.into_iter().collect()),
    });

    format!(
        "Please analyze the following sample of FDA device data related to \
         '{}'.\n\nData Sample Details (JSON format):\n{}",
        profile.query,
        // The json! macro output is always serializable.
        serde_json::to_string_pretty(&data).unwrap_or_default(),
    )
}

fn sample<T: serde::Serialize>(records: &[T], cap: usize) -> Vec<Value> {
    records
        .iter()
        .take(cap)
        .filter_map(|r| serde_json::to_value(r).ok())
        .collect()
}

fn section(name: &str, total: usize, samples: Vec<Value>) -> Value {
    json!({
        "section": name,
        "total_records": total,
        "sampled_records": samples.len(),
        "sample": samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AdverseEvent, RecallNotice};

    fn profile_with_records(recalls: usize, events: usize) -> DeviceProfile {
        let mut profile = DeviceProfile::empty("insulin pump");
        for i in 0..recalls {
            profile.recalls.push(RecallNotice {
                recall_number: format!("Z-{i:04}-2025"),
                event_date_initiated: None,
                recalling_firm: Some("Acme Medical".into()),
                product_description: None,
                recall_classification: Some("Class II".into()),
                reason_for_recall: Some("Battery failure".into()),
                recall_status: None,
                product_code: None,
                k_numbers: Vec::new(),
            });
        }
        for i in 0..events {
            profile.adverse_events.push(AdverseEvent {
                report_number: format!("MW{i:07}"),
                event_type: None,
                date_received: None,
                date_of_event: None,
                manufacturer_name: Some("Acme Medical".into()),
                brand_name: None,
                generic_name: None,
                product_code: None,
                product_problems: Vec::new(),
                adverse_event_flag: None,
                patient_outcomes: Vec::new(),
                remedial_action: None,
            });
        }
        profile
    }

    #[test]
    fn samples_are_capped_but_totals_are_honest() {
        let profile = profile_with_records(20, 30);
        let prompt = build_prompt(&profile);
        let data: serde_json::Value = {
            let start = prompt.find('{').expect("json payload");
            serde_json::from_str(&prompt[start..]).expect("valid json")
        };
        let sections = data["sections"].as_array().unwrap();
        let recalls = sections.iter().find(|s| s["section"] == "recalls").unwrap();
        assert_eq!(recalls["total_records"], 20);
        assert_eq!(recalls["sampled_records"], 5);
        let events = sections
            .iter()
            .find(|s| s["section"] == "adverse_events")
            .unwrap();
        assert_eq!(events["sampled_records"], 5);
    }

    #[test]
    fn prompt_names_the_query_and_risk_score() {
        let mut profile = profile_with_records(1, 0);
        profile.risk_score = 15.0;
        let prompt = build_prompt(&profile);
        assert!(prompt.contains("'insulin pump'"));
        assert!(prompt.contains("\"risk_score\": 15.0"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let profile = profile_with_records(3, 2);
        assert_eq!(build_prompt(&profile), build_prompt(&profile));
    }

    #[test]
    fn system_prompt_carries_the_response_headers() {
        for header in [
            "MAIN OBSERVATION:",
            "WHAT THIS MIGHT MEAN:",
            "OTHER DETAILS:",
            "IMPORTANT NOTE:",
        ] {
            assert!(SYSTEM_PROMPT.contains(header), "missing header {header}");
        }
    }
}
