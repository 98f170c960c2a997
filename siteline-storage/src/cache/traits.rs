//! Cache backend trait and statistics.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use siteline_core::ScopeId;

use super::key::ScopedCacheKey;

/// A type-erased cached value. The template downcasts it back on a hit.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be safe to call from any thread. Values are opaque
/// to the backend; it only tracks keys, insertion time and counters.
pub trait CacheBackend: Send + Sync {
    /// Look up a value. Entries older than `max_age` count as misses and may
    /// be dropped on the spot.
    fn get(&self, key: &ScopedCacheKey, max_age: Option<Duration>) -> Option<CachedValue>;

    /// Store a value, replacing any previous entry for the key.
    fn put(&self, key: ScopedCacheKey, value: CachedValue);

    /// Drop every entry belonging to a scope. Used when a site context is
    /// destroyed.
    fn evict_scope(&self, scope_id: ScopeId) -> u64;

    /// Drop entries of a scope that were stored under an older version.
    /// They are already unaddressable; this only frees memory.
    fn evict_stale(&self, scope_id: ScopeId, current_version: u64) -> u64;

    /// Get cache statistics.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired entries.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of entries dropped by expiry, scope eviction or stale sweeps.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
