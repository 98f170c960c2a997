//! In-memory cache backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use siteline_core::ScopeId;

use super::key::ScopedCacheKey;
use super::traits::{CacheBackend, CacheStats, CachedValue};

#[derive(Clone)]
struct CacheEntry {
    value: CachedValue,
    cached_at: DateTime<Utc>,
}

/// In-memory cache backend.
///
/// DashMap gives per-shard locking, so lookups for one site never wait on a
/// sweep of another site's scope.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<ScopedCacheKey, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_where(&self, predicate: impl Fn(&ScopedCacheKey) -> bool) -> u64 {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        let removed = before.saturating_sub(self.entries.len()) as u64;
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        removed
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn get(&self, key: &ScopedCacheKey, max_age: Option<Duration>) -> Option<CachedValue> {
        let entry = self.entries.get(key).map(|e| e.value().clone());

        let Some(entry) = entry else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if let Some(max_age) = max_age {
            let age = Utc::now()
                .signed_duration_since(entry.cached_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if age > max_age {
                if self.entries.remove(key).is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value)
    }

    fn put(&self, key: ScopedCacheKey, value: CachedValue) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                cached_at: Utc::now(),
            },
        );
    }

    fn evict_scope(&self, scope_id: ScopeId) -> u64 {
        self.evict_where(|key| key.scope_id() == scope_id)
    }

    fn evict_stale(&self, scope_id: ScopeId, current_version: u64) -> u64 {
        self.evict_where(|key| key.is_stale_for(scope_id, current_version))
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
