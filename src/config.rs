//! Retrieval and scoring configuration.
//!
//! Every tunable the pipeline consumes lives here as an explicit default:
//! the rate-limit floor, per-call timeout, cache TTL, fan-out caps, the
//! cross-source correlation window, and the risk-score weights. The weights
//! and the window are policy choices, not derived properties — callers who
//! disagree with the defaults override the fields, nothing reads them from
//! ambient state.

use serde::{Deserialize, Serialize};

/// Default openFDA device API root.
pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov/device";

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Upstream API root, without a trailing slash.
    pub base_url: String,
    /// Optional openFDA api_key for higher rate limits.
    pub api_key: Option<String>,
    /// Hard floor between two requests from the same client, in milliseconds.
    /// This is a minimum, not a target — the upstream fair-use policy asks
    /// for it even when responses come back faster.
    pub min_request_delay_ms: u64,
    /// Per-call timeout in seconds. Expiry counts as a transient failure.
    pub request_timeout_secs: u64,
    /// Backoff before the single retry on a transient failure, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Ceiling on deduplicated records accumulated per source.
    pub max_records_per_source: usize,
    /// Ceiling on query variants produced by expansion.
    pub max_variants: usize,
    /// Cache entry time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Date proximity window for cross-source record linking, in days.
    pub correlation_window_days: i64,
    /// Risk-score weights.
    pub risk: RiskWeights,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            min_request_delay_ms: 200,
            request_timeout_secs: 10,
            retry_backoff_ms: 1000,
            max_records_per_source: 500,
            max_variants: 8,
            cache_ttl_secs: 3600,
            correlation_window_days: 90,
            risk: RiskWeights::default(),
        }
    }
}

/// Weights for the derived risk score.
///
/// Each contribution is a fixed constant; the final score is the clamped
/// weighted sum, recomputed deterministically from the same record set.
/// Recall classes dominate, adverse events accumulate slowly, and
/// clearance/approval records carry a token positive weight — regulatory
/// activity is a signal of presence, not of risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWeights {
    /// Per Class I recall (most serious — reasonable probability of death
    /// or serious injury).
    pub class_i_recall: f64,
    /// Per Class II recall.
    pub class_ii_recall: f64,
    /// Per Class III recall.
    pub class_iii_recall: f64,
    /// Per adverse event report.
    pub adverse_event: f64,
    /// Once, if any classification record places the device in Class III.
    pub class_iii_device: f64,
    /// Per 510(k) clearance or PMA approval record.
    pub regulatory_activity: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            class_i_recall: 30.0,
            class_ii_recall: 15.0,
            class_iii_recall: 5.0,
            adverse_event: 2.0,
            class_iii_device: 10.0,
            regulatory_activity: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_has_no_trailing_slash() {
        let config = RetrievalConfig::default();
        assert!(!config.base_url.ends_with('/'));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn default_delay_is_a_fifth_of_a_second() {
        assert_eq!(RetrievalConfig::default().min_request_delay_ms, 200);
    }

    #[test]
    fn default_ttl_is_one_hour() {
        assert_eq!(RetrievalConfig::default().cache_ttl_secs, 3600);
    }

    #[test]
    fn recall_weights_ordered_by_severity() {
        let w = RiskWeights::default();
        assert!(w.class_i_recall > w.class_ii_recall);
        assert!(w.class_ii_recall > w.class_iii_recall);
        assert!(w.class_iii_recall > w.adverse_event);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RetrievalConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RetrievalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_variants, config.max_variants);
        assert_eq!(back.risk.class_i_recall, config.risk.class_i_recall);
    }
}
