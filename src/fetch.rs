//! Source Fetcher — paginated retrieval for one dataset.
//!
//! Variants are tried in priority order. For each variant the fetcher pages
//! through results (sorted by the dataset's date field for stable
//! pagination) until the record ceiling, a short page, the upstream's skip
//! ceiling, or the page-count safety ceiling. Records dedup by primary key
//! as pages arrive — a record already seen under an earlier variant is not
//! re-counted. A variant the upstream rejects is logged and skipped; the
//! fetch as a whole fails only when every variant failed.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{ClientError, DeviceApi};
use crate::config::RetrievalConfig;
use crate::query::{QueryVariant, VariantKind};
use crate::record::{DateRange, RawRecord, SourceResult};
use crate::source::SourceKind;

/// The upstream rejects any request with `skip` beyond this, capping what a
/// single (variant, source) pair can ever retrieve.
const MAX_SKIP: usize = 25_000;

/// Safety ceiling on pages per variant, guarding against an upstream whose
/// pagination never terminates.
const MAX_PAGES_PER_VARIANT: usize = 50;

/// Errors from fetching one source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every query variant was rejected by the upstream.
    #[error("all query variants failed for {kind}")]
    AllVariantsFailed { kind: SourceKind },

    /// The upstream became unavailable mid-fetch. The source is reported
    /// unavailable rather than half-fetched.
    #[error(transparent)]
    Upstream(#[from] ClientError),
}

/// Fetches one dataset at a time through a [`DeviceApi`].
pub struct SourceFetcher<'a> {
    api: &'a dyn DeviceApi,
    config: &'a RetrievalConfig,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(api: &'a dyn DeviceApi, config: &'a RetrievalConfig) -> Self {
        Self { api, config }
    }

    /// Retrieve up to `max_records` deduplicated records for `source`.
    pub fn fetch(
        &self,
        source: SourceKind,
        variants: &[QueryVariant],
        range: &DateRange,
        max_records: usize,
    ) -> Result<SourceResult, FetchError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut records: Vec<RawRecord> = Vec::new();
        let mut total_matched: u64 = 0;
        let mut any_variant_answered = false;

        'variants: for variant in variants {
            if records.len() >= max_records {
                break;
            }
            let expr = build_search_expr(source, variant);
            let mut skip = 0usize;
            let mut pages = 0usize;

            loop {
                let remaining = max_records - records.len();
                if remaining == 0 {
                    break 'variants;
                }
                let limit = source.page_limit().min(remaining);
                let url = self.build_url(source, &expr, limit, skip);

                let body = match self.api.get_json(&url) {
                    Ok(body) => body,
                    Err(e) if e.is_no_matches() => {
                        // An empty answer is still an answer.
                        any_variant_answered = true;
                        break;
                    }
                    Err(e @ ClientError::BadQuery { .. }) => {
                        warn!(
                            source = %source,
                            variant = %variant.text,
                            error = %e,
                            "variant rejected by upstream, skipping",
                        );
                        continue 'variants;
                    }
                    Err(e) => return Err(FetchError::Upstream(e)),
                };
                any_variant_answered = true;

                if let Some(total) = reported_total(&body) {
                    total_matched = total_matched.max(total);
                }
                let Some(results) = body.get("results").and_then(|r| r.as_array()) else {
                    break;
                };
                if results.is_empty() {
                    break;
                }

                for value in results {
                    let Some(record) = RawRecord::from_value(source, value) else {
                        debug!(source = %source, "dropping record without primary key");
                        continue;
                    };
                    if !range.admits(record.event_date()) {
                        continue;
                    }
                    if seen.insert(record.record_id()) {
                        records.push(record);
                        if records.len() >= max_records {
                            break 'variants;
                        }
                    }
                }

                // Short page: the upstream has no more matches for this variant.
                if results.len() < limit {
                    break;
                }
                pages += 1;
                if pages >= MAX_PAGES_PER_VARIANT {
                    warn!(source = %source, variant = %variant.text, "page ceiling hit");
                    break;
                }
                skip += results.len();
                // Stop before the request the upstream would refuse.
                if skip + limit > MAX_SKIP {
                    break;
                }
            }
        }

        if !any_variant_answered {
            return Err(FetchError::AllVariantsFailed { kind: source });
        }
        Ok(SourceResult {
            source,
            records,
            total_matched,
            fetched_at: Utc::now(),
        })
    }

    fn build_url(&self, source: SourceKind, expr: &str, limit: usize, skip: usize) -> String {
        let mut url = format!(
            "{}/{}?search={}&limit={}&skip={}",
            self.config.base_url,
            source.endpoint(),
            expr,
            limit,
            skip,
        );
        if let Some(field) = source.date_field() {
            url.push_str(&format!("&sort={field}:desc"));
        }
        if let Some(key) = &self.config.api_key {
            url.push_str(&format!("&api_key={key}"));
        }
        url
    }
}

/// Render a variant as a search expression over the source's indexed
/// fields, clauses joined with the upstream's literal `+OR+` combinator.
///
/// Exact variants use the `.exact` field suffix with a quoted phrase;
/// everything else relies on tokenized matching with words joined by `+`.
fn build_search_expr(source: SourceKind, variant: &QueryVariant) -> String {
    let joined = variant.text.split_whitespace().collect::<Vec<_>>().join("+");
    let clauses: Vec<String> = source
        .search_fields()
        .iter()
        .map(|field| match variant.kind {
            VariantKind::Exact => format!("{field}.exact:\"{joined}\""),
            _ => format!("{field}:{joined}"),
        })
        .collect();
    if clauses.len() == 1 {
        clauses.into_iter().next().unwrap_or_default()
    } else {
        format!("({})", clauses.join("+OR+"))
    }
}

fn reported_total(body: &Value) -> Option<u64> {
    body.get("meta")?
        .get("results")?
        .get("total")?
        .as_u64()
}
