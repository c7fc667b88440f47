//! Query-result cache with strict TTL expiry.
//!
//! The cache is the only durable state in the pipeline and it is best
//! effort, not a correctness primitive: a miss costs network calls, never
//! wrong answers. It is injected explicitly (get/put/purge behind a trait)
//! so tests substitute their own and nothing reads ambient state. The one
//! guarantee is per-key atomicity — a reader never observes a partially
//! written entry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::record::DateRange;
use crate::retrieve::Retrieval;
use crate::source::SourceKind;

/// Cache key: normalized query text, sorted deduplicated sources, and the
/// date range. Two spellings of the same request must collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    sources: Vec<SourceKind>,
    range: DateRange,
}

impl CacheKey {
    pub fn new(raw_query: &str, sources: &[SourceKind], range: &DateRange) -> Self {
        let mut sorted: Vec<SourceKind> = sources.to_vec();
        sorted.sort();
        sorted.dedup();
        Self {
            query: raw_query.trim().to_lowercase(),
            sources: sorted,
            range: *range,
        }
    }
}

/// Injectable cache service for retrieval outcomes.
pub trait ResultCache: Send + Sync {
    /// Return the stored outcome for `key` if it has not expired.
    fn get(&self, key: &CacheKey) -> Option<Retrieval>;
    /// Store `value` under `key` with a fresh TTL stamp, replacing any
    /// prior entry.
    fn put(&self, key: CacheKey, value: Retrieval);
    /// Drop all expired entries.
    fn purge_expired(&self);
}

struct Entry {
    value: Retrieval,
    expires_at: Instant,
}

/// In-memory TTL cache. Entries expire strictly: a read at or past the
/// expiry instant is a miss.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            // A poisoned cache lock forfeits nothing but cached work.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Retrieval> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, value: Retrieval) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().insert(key, entry);
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.lock().retain(|_, entry| now < entry.expires_at);
    }
}
