//! Multi-Source Retriever — fans one query out across the six datasets.
//!
//! The query is validated and expanded exactly once, before any network
//! call. A cache hit within the TTL answers without touching the upstream.
//! On a miss, sources are fetched sequentially; one source failing does not
//! abort the rest — it is listed as unavailable and downstream consumers
//! tolerate the gap. The only fatal error is an invalid query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, MemoryCache, ResultCache};
use crate::client::{DeviceApi, FdaClient};
use crate::config::RetrievalConfig;
use crate::fetch::SourceFetcher;
use crate::query::{expand, QueryError};
use crate::record::{DateRange, SourceResult};
use crate::source::SourceKind;

/// Outcome of one multi-source retrieval: per-source results plus the
/// sources that could not be reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retrieval {
    pub results: BTreeMap<SourceKind, SourceResult>,
    pub unavailable: Vec<SourceKind>,
}

impl Retrieval {
    /// Total records across all sources.
    pub fn total_records(&self) -> usize {
        self.results.values().map(|r| r.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.results.values().all(|r| r.records.is_empty())
    }
}

/// Orchestrates query expansion, per-source fetching, and caching.
pub struct DeviceRetriever {
    api: Box<dyn DeviceApi>,
    cache: Box<dyn ResultCache>,
    config: RetrievalConfig,
}

impl DeviceRetriever {
    /// Build a retriever over explicit collaborators. Tests inject stubs
    /// here.
    pub fn new(
        api: Box<dyn DeviceApi>,
        cache: Box<dyn ResultCache>,
        config: RetrievalConfig,
    ) -> Self {
        Self { api, cache, config }
    }

    /// Build a retriever against the live openFDA API with an in-memory
    /// cache.
    pub fn openfda(config: RetrievalConfig) -> Result<Self, crate::client::ClientError> {
        let api = FdaClient::new(&config)?;
        let ttl = std::time::Duration::from_secs(config.cache_ttl_secs);
        Ok(Self::new(Box::new(api), Box::new(MemoryCache::new(ttl)), config))
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve `sources` for `raw_query` within `range`.
    ///
    /// Fails only on an invalid query, and does so before any network call
    /// is attempted. The cache is consulted before expansion — a hit
    /// answers without any per-variant work.
    pub fn retrieve(
        &self,
        raw_query: &str,
        sources: &[SourceKind],
        range: &DateRange,
    ) -> Result<Retrieval, QueryError> {
        if raw_query.trim().is_empty() {
            return Err(QueryError::Empty);
        }

        let key = CacheKey::new(raw_query, sources, range);
        if let Some(hit) = self.cache.get(&key) {
            debug!(query = raw_query, "cache hit, skipping upstream");
            return Ok(hit);
        }

        let variants = expand(raw_query, self.config.max_variants)?;

        let fetcher = SourceFetcher::new(self.api.as_ref(), &self.config);
        let mut results = BTreeMap::new();
        let mut unavailable = Vec::new();

        for &source in sources {
            if results.contains_key(&source) || unavailable.contains(&source) {
                continue;
            }
            match fetcher.fetch(source, &variants, range, self.config.max_records_per_source) {
                Ok(result) => {
                    info!(
                        source = %source,
                        records = result.records.len(),
                        total_matched = result.total_matched,
                        "source fetched",
                    );
                    results.insert(source, result);
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "source unavailable");
                    unavailable.push(source);
                }
            }
        }

        let retrieval = Retrieval { results, unavailable };
        self.cache.put(key, retrieval.clone());
        Ok(retrieval)
    }

    /// Retrieve all six datasets.
    pub fn retrieve_all(
        &self,
        raw_query: &str,
        range: &DateRange,
    ) -> Result<Retrieval, QueryError> {
        self.retrieve(raw_query, &SourceKind::ALL, range)
    }
}
