//! Bounded, time-boxed memoization of query results
//!
//! Entries are never mutated in place; a new result replaces the old entry
//! wholesale. Reads use `peek`, so the LRU order is insertion order and the
//! size bound evicts the oldest entry first.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use kiosksearch_config::CacheConfig;

use crate::clock::Clock;
use crate::query::PreparedQuery;
use crate::result::SearchResult;

/// Deterministic fingerprint of a prepared query
///
/// Built from the case-folded sanitized text and the resolved filters in a
/// fixed field order, so semantically identical queries share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn fingerprint(query: &PreparedQuery) -> Self {
        let mut categories: Vec<&str> = query.categories.iter().map(|c| c.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();

        let filter = &query.filter;
        let canonical = format!(
            "text={text}\u{1f}categories={categories}\u{1f}year_min={year_min:?}\u{1f}year_max={year_max:?}\u{1f}publication_type={publication_type:?}\u{1f}department={department:?}\u{1f}limit={limit}\u{1f}offset={offset}\u{1f}sort={sort}",
            text = query.text.phrase(),
            categories = categories.join(","),
            year_min = filter.year_min,
            year_max = filter.year_max,
            publication_type = filter.publication_type,
            department = filter.department,
            limit = query.limit,
            offset = query.offset,
            sort = query.sort_by,
        );

        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One memoized result set
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub results: Vec<SearchResult>,
    pub total_count: u64,
    /// Whether the fallback strategy produced these results
    pub used_fallback: bool,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Process-wide result cache shared by overlapping `submit` calls
///
/// The lock is held only for in-memory bookkeeping, never across a
/// repository call.
pub struct ResultCache {
    entries: Mutex<LruCache<CacheKey, Arc<CacheEntry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.capacity, config.ttl(), clock)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<CacheEntry>>> {
        // Entries are replaced wholesale, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A live entry for `key`, or `None` when absent or older than the TTL
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let now = self.clock.now();
        let entries = self.lock();
        entries
            .peek(key)
            .filter(|entry| entry.age(now) <= self.ttl)
            .map(Arc::clone)
    }

    /// The entry for `key` regardless of age
    pub fn get_stale(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.lock().peek(key).map(Arc::clone)
    }

    /// Store a fresh entry, replacing any previous one for `key`
    pub fn put(
        &self,
        key: CacheKey,
        results: Vec<SearchResult>,
        total_count: u64,
        used_fallback: bool,
    ) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            results,
            total_count,
            used_fallback,
            created_at: self.clock.now(),
        });

        let mut entries = self.lock();
        // Re-inserting must move the key to the newest position
        entries.pop(&key);
        if let Some((evicted, _)) = entries.push(key, Arc::clone(&entry)) {
            tracing::debug!(key = %evicted, "Evicted oldest cache entry");
        }
        entry
    }

    /// Drop every entry, e.g. after a bulk import
    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::query::{FilterSet, SearchQuery};
    use kiosksearch_config::QueryConfig;
    use kiosksearch_data::ContentType;

    fn key(text: &str) -> CacheKey {
        let prepared =
            PreparedQuery::prepare(&SearchQuery::new(text), &QueryConfig::default()).unwrap();
        CacheKey::fingerprint(&prepared)
    }

    fn cache(capacity: usize) -> (Arc<ManualClock>, ResultCache) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::new(capacity, Duration::from_secs(300), Arc::clone(&clock) as Arc<dyn Clock>);
        (clock, cache)
    }

    #[test]
    fn test_fingerprint_ignores_case_and_spacing() {
        assert_eq!(key("Castilla"), key("  castilla "));
        assert_ne!(key("castilla"), key("castillo"));
        assert_eq!(key("castilla").as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_category_insertion_order() {
        let config = QueryConfig::default();
        let a = SearchQuery::new("x").with_filters(
            FilterSet::default()
                .with_category(ContentType::Image)
                .with_category(ContentType::Person),
        );
        let b = SearchQuery::new("x").with_filters(
            FilterSet::default()
                .with_category(ContentType::Person)
                .with_category(ContentType::Image),
        );
        assert_eq!(
            CacheKey::fingerprint(&PreparedQuery::prepare(&a, &config).unwrap()),
            CacheKey::fingerprint(&PreparedQuery::prepare(&b, &config).unwrap())
        );
    }

    #[test]
    fn test_decade_and_equivalent_range_share_a_key() {
        let config = QueryConfig::default();
        let decade = SearchQuery::new("x").with_filters(FilterSet::default().with_decade("1990s"));
        let range =
            SearchQuery::new("x").with_filters(FilterSet::default().with_year_range(1990, 1999));
        assert_eq!(
            CacheKey::fingerprint(&PreparedQuery::prepare(&decade, &config).unwrap()),
            CacheKey::fingerprint(&PreparedQuery::prepare(&range, &config).unwrap())
        );
    }

    #[test]
    fn test_entries_expire_after_ttl_but_stay_stale_readable() {
        let (clock, cache) = cache(10);
        let k = key("castilla");
        cache.put(k.clone(), Vec::new(), 0, false);

        clock.advance(Duration::from_secs(300));
        assert!(cache.get(&k).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&k).is_none());
        assert!(cache.get_stale(&k).is_some());
    }

    #[test]
    fn test_oldest_entry_is_evicted_first() {
        let (_clock, cache) = cache(2);
        let (a, b, c) = (key("a"), key("b"), key("c"));
        cache.put(a.clone(), Vec::new(), 0, false);
        cache.put(b.clone(), Vec::new(), 0, false);

        // Reads do not refresh an entry's position
        assert!(cache.get(&a).is_some());
        cache.put(c.clone(), Vec::new(), 0, false);

        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
        assert!(cache.get(&c).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_all_clears_everything() {
        let (_clock, cache) = cache(10);
        cache.put(key("a"), Vec::new(), 0, true);
        cache.put(key("b"), Vec::new(), 0, false);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
