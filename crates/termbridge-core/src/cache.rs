//! In-memory response cache keyed by query fingerprint.
//!
//! The cache is process-lifetime scoped and never persisted. Expired entries
//! behave as a miss and are dropped lazily on the lookup that finds them;
//! there is no background sweep. Concurrent misses for the same fingerprint
//! are not coalesced: each caller fetches independently and the last
//! successful put wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::query::QueryFingerprint;
use crate::result::QueryResult;

/// How a single request interacts with a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read a fresh entry when present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite any cached entry.
    Refresh,
    /// Always fetch; neither read from nor write to the cache.
    Bypass,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) < self.ttl
    }
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<QueryFingerprint, CacheEntry>,
    default_ttl: Duration,
    max_entries: usize,
}

impl CacheInner {
    fn get(&mut self, fingerprint: &QueryFingerprint) -> Option<QueryResult> {
        let now = Instant::now();
        match self.map.get(fingerprint) {
            Some(entry) if entry.is_fresh(now) => Some(entry.result.clone()),
            Some(_) => {
                self.map.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    fn put(&mut self, fingerprint: QueryFingerprint, result: QueryResult, ttl: Duration) {
        if !self.map.contains_key(&fingerprint) && self.map.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.map.insert(
            fingerprint,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(fingerprint, _)| fingerprint.clone());
        if let Some(fingerprint) = oldest {
            self.map.remove(&fingerprint);
        }
    }

    fn clear_expired(&mut self) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.is_fresh(now));
    }
}

/// Thread-safe TTL cache shared across concurrent requests.
///
/// The lock is held only for the duration of a single map operation, never
/// across an upstream fetch.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                map: HashMap::new(),
                default_ttl,
                max_entries: max_entries.max(1),
            })),
        }
    }

    /// Cache with the defaults the original deployment used: 5 minute TTL,
    /// 1000 entries.
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(300), 1000)
    }

    /// Cache that stores nothing (zero TTL makes every entry stale at birth).
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, 1)
    }

    pub async fn get(&self, fingerprint: &QueryFingerprint) -> Option<QueryResult> {
        let mut inner = self.inner.write().await;
        inner.get(fingerprint)
    }

    pub async fn put(&self, fingerprint: QueryFingerprint, result: QueryResult) {
        let mut inner = self.inner.write().await;
        if inner.default_ttl == Duration::ZERO {
            return;
        }
        let ttl = inner.default_ttl;
        inner.put(fingerprint, result, ttl);
    }

    pub async fn put_with_ttl(
        &self,
        fingerprint: QueryFingerprint,
        result: QueryResult,
        ttl: Duration,
    ) {
        if ttl == Duration::ZERO {
            return;
        }
        let mut inner = self.inner.write().await;
        inner.put(fingerprint, result, ttl);
    }

    /// Drop all expired entries eagerly. Optional housekeeping; lookups
    /// already treat expired entries as misses.
    pub async fn clear_expired(&self) {
        let mut inner = self.inner.write().await;
        inner.clear_expired();
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.map.clear();
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FieldCode, HistoricalQuery, MarketDate, Security};
    use crate::result::{DataOrigin, FieldValue, QueryRow};

    fn fingerprint(tag: &str) -> QueryFingerprint {
        HistoricalQuery::new(
            vec![Security::parse(tag).unwrap()],
            vec![FieldCode::parse("PX_LAST").unwrap()],
            MarketDate::parse("2024-01-01").unwrap(),
            MarketDate::parse("2024-01-02").unwrap(),
        )
        .unwrap()
        .fingerprint()
    }

    fn result(value: f64) -> QueryResult {
        QueryResult::new(
            DataOrigin::Mock,
            vec![QueryRow {
                security: Security::parse("AAPL US Equity").unwrap(),
                field: FieldCode::parse("PX_LAST").unwrap(),
                date: MarketDate::parse("2024-01-02").unwrap(),
                value: FieldValue::Number(value),
            }],
        )
    }

    #[tokio::test]
    async fn miss_then_hit_then_overwrite() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        let key = fingerprint("AAPL US Equity");

        assert!(cache.get(&key).await.is_none());

        cache.put(key.clone(), result(1.0)).await;
        assert_eq!(cache.get(&key).await.unwrap().rows[0].value, FieldValue::Number(1.0));

        cache.put(key.clone(), result(2.0)).await;
        assert_eq!(cache.get(&key).await.unwrap().rows[0].value, FieldValue::Number(2.0));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_and_is_removed() {
        let cache = ResponseCache::new(Duration::from_millis(40), 10);
        let key = fingerprint("MSFT US Equity");

        cache.put(key.clone(), result(1.0)).await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn size_bound_evicts_oldest_insertion() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        let first = fingerprint("A US Equity");
        let second = fingerprint("B US Equity");
        let third = fingerprint("C US Equity");

        cache.put(first.clone(), result(1.0)).await;
        cache.put(second.clone(), result(2.0)).await;
        cache.put(third.clone(), result(3.0)).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&first).await.is_none());
        assert!(cache.get(&second).await.is_some());
        assert!(cache.get(&third).await.is_some());
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let cache = ResponseCache::disabled();
        let key = fingerprint("AAPL US Equity");

        cache.put(key.clone(), result(1.0)).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn clear_expired_drops_only_stale_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        let fresh = fingerprint("FRESH US Equity");
        let stale = fingerprint("STALE US Equity");

        cache
            .put_with_ttl(stale.clone(), result(1.0), Duration::from_millis(20))
            .await;
        cache.put(fresh.clone(), result(2.0)).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.clear_expired().await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&fresh).await.is_some());
    }
}
