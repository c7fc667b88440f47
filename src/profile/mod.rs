//! Correlator — folds per-source results into one [`DeviceProfile`].
//!
//! **Design**: correlation is pure. It takes a finished retrieval and
//! configuration, performs no I/O, and the same input always yields the
//! same profile, links and score included. Sources the retriever marked
//! unavailable simply contribute nothing.

mod links;
mod risk;
mod types;

pub use types::{CrossSourceLink, DeviceProfile, LinkReason, RegulatorySummary, TimelineEntry};

use crate::config::RetrievalConfig;
use crate::record::RawRecord;
use crate::retrieve::Retrieval;

/// Build the correlated profile for one query's retrieval.
pub fn correlate(query: &str, retrieval: &Retrieval, config: &RetrievalConfig) -> DeviceProfile {
    let mut profile = DeviceProfile::empty(query);

    for result in retrieval.results.values() {
        for record in &result.records {
            if let Some(name) = record.manufacturer() {
                profile.manufacturers.insert(name.to_string());
            }
            if let Some(code) = record.product_code() {
                profile.product_codes.insert(code.to_string());
            }
            if let Some(date) = record.event_date() {
                profile.timeline.push(TimelineEntry {
                    date,
                    source: record.source(),
                    description: record.timeline_title(),
                });
            }
            match record {
                RawRecord::Clearance(r) => profile.clearances.push(r.clone()),
                RawRecord::Approval(r) => profile.approvals.push(r.clone()),
                RawRecord::Event(r) => profile.adverse_events.push(r.clone()),
                RawRecord::Recall(r) => profile.recalls.push(r.clone()),
                RawRecord::Classification(r) => profile.classifications.push(r.clone()),
                RawRecord::Udi(r) => profile.udi_entries.push(r.clone()),
            }
        }
    }

    // Ascending by date; same-day entries surface safety sources first.
    profile.timeline.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.source.safety_priority().cmp(&b.source.safety_priority()))
    });

    profile.risk_score = risk::score(&profile, &config.risk);
    profile.links = links::link_records(&profile, config.correlation_window_days);

    tracing::debug!(
        query,
        records = profile.total_records(),
        risk_score = profile.risk_score,
        links = profile.links.len(),
        "profile correlated",
    );
    profile
}
