//! The per-site runtime context.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use siteline_core::{SiteConfig, SiteEventKind, SiteName, Timestamp};
use siteline_storage::{CacheScope, CacheTemplate, ContentStoreAdapter, StoreContext};

/// Everything one site needs at runtime: its composed store adapter, the
/// store context (with the cache scope), configuration, and the instants of
/// the last events it observed.
///
/// The site name never changes. A rebuild produces a new `SiteContext`
/// rather than mutating this one; only the cache version and the event
/// timestamps move during the context's life.
pub struct SiteContext {
    site_name: SiteName,
    fallback: bool,
    store_adapter: Arc<dyn ContentStoreAdapter>,
    store_context: StoreContext,
    config: SiteConfig,
    cache: Arc<CacheTemplate>,
    built_at: Timestamp,
    events: DashMap<SiteEventKind, Timestamp>,
    destroyed: AtomicBool,
}

impl SiteContext {
    /// Assemble a context. `ContextBuilt` and `CacheCleared` are both stamped
    /// with the construction instant.
    pub fn new(
        site_name: SiteName,
        fallback: bool,
        store_adapter: Arc<dyn ContentStoreAdapter>,
        store_context: StoreContext,
        config: SiteConfig,
        cache: Arc<CacheTemplate>,
    ) -> Self {
        let built_at = Utc::now();
        let events = DashMap::new();
        events.insert(SiteEventKind::ContextBuilt, built_at);
        events.insert(SiteEventKind::CacheCleared, built_at);

        Self {
            site_name,
            fallback,
            store_adapter,
            store_context,
            config,
            cache,
            built_at,
            events,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn site_name(&self) -> &SiteName {
        &self.site_name
    }

    /// Whether this is the shared default-site context.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// The composed (decorated) store adapter.
    pub fn store_adapter(&self) -> &Arc<dyn ContentStoreAdapter> {
        &self.store_adapter
    }

    pub fn store_context(&self) -> &StoreContext {
        &self.store_context
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn cache_scope(&self) -> &CacheScope {
        self.store_context.cache_scope()
    }

    pub fn cache_version(&self) -> u64 {
        self.cache_scope().version()
    }

    pub fn built_at(&self) -> Timestamp {
        self.built_at
    }

    /// Last observed instant of `kind`.
    pub fn last_event(&self, kind: SiteEventKind) -> Option<Timestamp> {
        self.events.get(&kind).map(|at| *at.value())
    }

    /// Record an observed event instant.
    pub fn record_event(&self, kind: SiteEventKind, at: Timestamp) {
        self.events.insert(kind, at);
    }

    /// Invalidate every cached entry of this site by bumping the cache
    /// version, then sweep the entries left behind. `observed` becomes the
    /// `CacheCleared` instant. Returns the new version.
    pub fn clear_cache(&self, observed: Timestamp) -> u64 {
        let version = self.cache_scope().bump();
        self.record_event(SiteEventKind::CacheCleared, observed);
        let swept = self.cache.evict_stale(self.cache_scope());

        tracing::info!(
            site = %self.site_name,
            version,
            swept,
            "Site cache cleared"
        );
        version
    }

    /// Whether the context has not been destroyed.
    pub fn is_valid(&self) -> bool {
        !self.destroyed.load(Ordering::SeqCst)
    }

    /// Release this context's cached entries and mark it invalid. Holders of
    /// an `Arc` can keep reading; they just won't find anything cached.
    /// Calling it twice is a no-op.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let evicted = self.cache.retire_scope(self.cache_scope());
        tracing::info!(
            site = %self.site_name,
            scope = %self.cache_scope().id(),
            evicted,
            "Site context destroyed"
        );
    }
}

impl fmt::Debug for SiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteContext")
            .field("site_name", &self.site_name)
            .field("fallback", &self.fallback)
            .field("adapter", &self.store_adapter.name())
            .field("root", &self.store_context.root())
            .field("cache_version", &self.cache_version())
            .field("built_at", &self.built_at)
            .field("valid", &self.is_valid())
            .finish()
    }
}
