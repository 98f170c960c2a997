//! Cache template: keyed memoization per cache scope.
//!
//! Callers hand over a scope, a caching policy, a logical operation name
//! with its arguments, and a producer to run on a miss. The template keys
//! the result by `(scope, version, operation, arguments)`.

use std::future::Future;
use std::sync::Arc;

use siteline_core::{CachingOptions, ScopeId, SitelineResult};

use super::key::ScopedCacheKey;
use super::memory_backend::InMemoryCacheBackend;
use super::scope::CacheScope;
use super::traits::{CacheBackend, CacheStats, CachedValue};

/// Keyed memoization facility shared by every site context in the process.
///
/// # Example
///
/// ```ignore
/// let template = CacheTemplate::in_memory();
/// let item = template
///     .get_object(ctx.cache_scope(), None, "findFile", &[path], || async {
///         base.find_file(&ctx, None, path).await
///     })
///     .await?;
/// ```
#[derive(Clone)]
pub struct CacheTemplate {
    backend: Arc<dyn CacheBackend>,
}

impl CacheTemplate {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Create a template over a fresh [`InMemoryCacheBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheBackend::new()))
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    /// Return the cached value for the key, or run `producer`, cache its
    /// value and return it.
    ///
    /// With caching disabled in `options` the producer always runs and
    /// nothing is stored. Producer errors propagate and are never cached.
    /// Concurrent misses on the same key may both run the producer; the
    /// later write wins, and both results are equivalent by contract.
    ///
    /// A value is only stored if the scope is still live and at the version
    /// the key was built for once the producer returns. Reads through a
    /// retired scope always run the producer.
    pub async fn get_object<T, F, Fut>(
        &self,
        scope: &CacheScope,
        options: Option<&CachingOptions>,
        operation: &'static str,
        parts: &[&str],
        producer: F,
    ) -> SitelineResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = SitelineResult<T>>,
    {
        let options = CachingOptions::resolve(options);
        if !options.do_caching || scope.is_retired() {
            return producer().await;
        }

        let key = ScopedCacheKey::new(scope, operation, parts);
        let version = key.version();

        if let Some(cached) = self.backend.get(&key, options.expire_after) {
            if let Some(value) = cached.downcast_ref::<T>() {
                tracing::trace!(key = %key, "Cache hit");
                return Ok(value.clone());
            }
            tracing::warn!(key = %key, "Cached value has unexpected type, recomputing");
        }

        tracing::debug!(key = %key, "Cache miss");
        let value = producer().await?;
        if scope.is_retired() || scope.is_newer_than(key.version()) {
            tracing::debug!(key = %key, "Scope moved on while producing, not storing");
            return Ok(value);
        }

        let stored: CachedValue = Arc::new(value.clone());
        self.backend.put(key, stored);

        // A retire or bump racing the put above must not leave the entry behind.
        if scope.is_retired() {
            self.backend.evict_scope(scope.id());
        } else if scope.version() != version {
            self.backend.evict_stale(scope.id(), scope.version());
        }
        Ok(value)
    }

    /// Drop every entry of a scope.
    pub fn evict_scope(&self, scope_id: ScopeId) -> u64 {
        self.backend.evict_scope(scope_id)
    }

    /// Retire `scope` and drop its entries. Nothing is stored under it
    /// afterwards, including by producers already running.
    pub fn retire_scope(&self, scope: &CacheScope) -> u64 {
        scope.retire();
        self.backend.evict_scope(scope.id())
    }

    /// Drop entries of a scope stored under versions older than its current
    /// one.
    pub fn evict_stale(&self, scope: &CacheScope) -> u64 {
        self.backend.evict_stale(scope.id(), scope.version())
    }

    pub fn stats(&self) -> CacheStats {
        self.backend.stats()
    }
}

impl Default for CacheTemplate {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for CacheTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTemplate")
            .field("stats", &self.backend.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteline_core::{SitelineError, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn produce(calls: &AtomicUsize, value: &str) -> SitelineResult<String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value.to_string())
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();
        let calls = AtomicUsize::new(0);

        let first = template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "x"))
            .await
            .expect("first get should succeed");
        let second = template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "y"))
            .await
            .expect("second get should succeed");

        assert_eq!(first, "x");
        assert_eq!(second, "x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_bump_forces_recompute() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();
        let calls = AtomicUsize::new(0);

        template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "x"))
            .await
            .unwrap();
        scope.bump();
        let after = template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "y"))
            .await
            .unwrap();

        assert_eq!(after, "y");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_caching_always_produces() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();
        let calls = AtomicUsize::new(0);
        let disabled = CachingOptions::disabled();

        for _ in 0..3 {
            template
                .get_object(&scope, Some(&disabled), "op", &["a"], || produce(&calls, "x"))
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(template.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();

        let err = template
            .get_object::<String, _, _>(&scope, None, "op", &["a"], || async {
                Err(SitelineError::from(StoreError::Backend {
                    reason: "down".to_string(),
                }))
            })
            .await;
        assert!(err.is_err());

        let calls = AtomicUsize::new(0);
        let ok = template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "x"))
            .await
            .unwrap();
        assert_eq!(ok, "x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scopes_do_not_share_entries() {
        let template = CacheTemplate::in_memory();
        let scope_a = CacheScope::new();
        let scope_b = CacheScope::new();
        let calls = AtomicUsize::new(0);

        let a = template
            .get_object(&scope_a, None, "op", &["a"], || produce(&calls, "from-a"))
            .await
            .unwrap();
        let b = template
            .get_object(&scope_b, None, "op", &["a"], || produce(&calls, "from-b"))
            .await
            .unwrap();

        assert_eq!(a, "from-a");
        assert_eq!(b, "from-b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_evict_stale_after_bump() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();
        let calls = AtomicUsize::new(0);

        template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "x"))
            .await
            .unwrap();
        scope.bump();

        assert_eq!(template.evict_stale(&scope), 1);
        assert_eq!(template.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_retired_scope_stores_nothing() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();
        let calls = AtomicUsize::new(0);

        template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "x"))
            .await
            .unwrap();
        assert_eq!(template.retire_scope(&scope), 1);

        for _ in 0..2 {
            let value = template
                .get_object(&scope, None, "op", &["a"], || produce(&calls, "y"))
                .await
                .unwrap();
            assert_eq!(value, "y");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(template.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_retire_during_produce_is_not_stored() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();

        let value = template
            .get_object(&scope, None, "op", &["a"], || async {
                template.retire_scope(&scope);
                Ok("late".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "late");
        assert_eq!(template.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_bump_during_produce_is_not_stored() {
        let template = CacheTemplate::in_memory();
        let scope = CacheScope::new();
        let calls = AtomicUsize::new(0);

        template
            .get_object(&scope, None, "op", &["a"], || async {
                scope.bump();
                Ok("stale".to_string())
            })
            .await
            .unwrap();
        assert_eq!(template.stats().entry_count, 0);

        let fresh = template
            .get_object(&scope, None, "op", &["a"], || produce(&calls, "fresh"))
            .await
            .unwrap();
        assert_eq!(fresh, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
