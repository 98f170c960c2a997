//! Site context lifecycle: lazy creation, rebuild, fallback resolution and
//! teardown.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use siteline_core::{
    ConfigError, ContextError, SiteConfig, SiteName, SitelineError, SitelineResult, StoreError,
    SITE_CONFIG_PATH,
};
use siteline_storage::{
    build_adapter_chain, read_uncached, AdapterDecorator, CacheTemplate, CachingDecorator,
    ContentStoreAdapter, StoreContext, TranslatingDecorator,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::registry::SiteContextRegistry;
use crate::site_context::SiteContext;

/// Placeholder replaced by the site name in a root template.
pub const SITE_NAME_PLACEHOLDER: &str = "{siteName}";

// ============================================================================
// FACTORY
// ============================================================================

/// Builds fresh site contexts. The manager never constructs contexts itself,
/// so tests and embedders can swap how a site gets assembled.
#[async_trait]
pub trait SiteContextFactory: Send + Sync {
    async fn create_context(&self, site: &SiteName, fallback: bool) -> SitelineResult<SiteContext>;
}

/// Assembles a context from one base store adapter shared by every site.
///
/// Steps, in order:
/// 1. resolve the site's store root from the root template
/// 2. open a store context through the base adapter
/// 3. read `/config/site-config.toml` uncached (missing means defaults)
/// 4. compose the decorator chain: extra decorators, path translation if
///    configured, caching if enabled globally and for the site
/// 5. validate the store context through the composed chain
pub struct DefaultSiteContextFactory {
    base: Arc<dyn ContentStoreAdapter>,
    cache: Arc<CacheTemplate>,
    root_template: String,
    decorators: Vec<Arc<dyn AdapterDecorator>>,
    caching_enabled: bool,
}

impl DefaultSiteContextFactory {
    pub fn new(base: Arc<dyn ContentStoreAdapter>, cache: Arc<CacheTemplate>) -> Self {
        Self {
            base,
            cache,
            root_template: SITE_NAME_PLACEHOLDER.to_string(),
            decorators: Vec::new(),
            caching_enabled: true,
        }
    }

    /// Store root pattern, e.g. `/srv/sites/{siteName}`.
    pub fn with_root_template(mut self, template: impl Into<String>) -> Self {
        self.root_template = template.into();
        self
    }

    /// Add a decorator applied before the built-in ones.
    pub fn with_decorator(mut self, decorator: Arc<dyn AdapterDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Globally enable or disable the caching decorator.
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<CacheTemplate> {
        &self.cache
    }

    pub fn root_for(&self, site: &SiteName) -> String {
        self.root_template.replace(SITE_NAME_PLACEHOLDER, site.as_str())
    }

    async fn load_config(
        &self,
        site: &SiteName,
        store_context: &StoreContext,
    ) -> SitelineResult<SiteConfig> {
        let bytes = match read_uncached(self.base.as_ref(), store_context, SITE_CONFIG_PATH).await? {
            Some(bytes) => bytes,
            None => {
                tracing::debug!(site = %site, "No site config found, using defaults");
                return Ok(SiteConfig::default());
            }
        };

        let source_name = format!("{}{}", site, SITE_CONFIG_PATH);
        let text = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
            source_name: source_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(SiteConfig::from_toml(&source_name, &text)?)
    }
}

#[async_trait]
impl SiteContextFactory for DefaultSiteContextFactory {
    async fn create_context(&self, site: &SiteName, fallback: bool) -> SitelineResult<SiteContext> {
        let root = self.root_for(site);
        let store_context = self.base.create_context(site, &root).await?;
        let config = self.load_config(site, &store_context).await?;

        let mut decorators = self.decorators.clone();
        if let Some(translation) = &config.path_translation {
            decorators.push(Arc::new(TranslatingDecorator::new(translation.clone())));
        }
        if self.caching_enabled && config.cache_enabled {
            decorators.push(Arc::new(CachingDecorator::new(Arc::clone(&self.cache))));
        }
        let adapter = build_adapter_chain(Arc::clone(&self.base), &decorators);

        if !adapter.validate(&store_context).await? {
            return Err(StoreError::InvalidContext {
                site: site.to_string(),
                reason: format!("store root {} failed validation", root),
            }
            .into());
        }

        let context = SiteContext::new(
            site.clone(),
            fallback,
            adapter,
            store_context,
            config,
            Arc::clone(&self.cache),
        );
        tracing::info!(
            site = %site,
            fallback,
            root = %root,
            decorators = decorators.len(),
            "Site context built"
        );
        Ok(context)
    }
}

// ============================================================================
// MANAGER
// ============================================================================

/// Owns the registry and every change made to it.
///
/// Creation and rebuild of a site run under that site's own lock; lookups and
/// work on other sites never wait on it.
pub struct SiteContextManager {
    factory: Arc<dyn SiteContextFactory>,
    registry: SiteContextRegistry,
    fallback_site: RwLock<Option<SiteName>>,
    site_locks: DashMap<SiteName, Arc<Mutex<()>>>,
}

impl SiteContextManager {
    pub fn new(factory: Arc<dyn SiteContextFactory>) -> Self {
        Self {
            factory,
            registry: SiteContextRegistry::new(),
            fallback_site: RwLock::new(None),
            site_locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &SiteContextRegistry {
        &self.registry
    }

    /// Name the site whose context serves lookups for unknown sites.
    pub async fn set_fallback_site(&self, site: Option<SiteName>) {
        tracing::info!(fallback = ?site.as_ref().map(SiteName::as_str), "Fallback site set");
        *self.fallback_site.write().await = site;
    }

    pub async fn fallback_site(&self) -> Option<SiteName> {
        self.fallback_site.read().await.clone()
    }

    async fn lock_site(&self, site: &SiteName) -> SiteLockGuard<'_> {
        let lock = Arc::clone(
            self.site_locks
                .entry(site.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        SiteLockGuard {
            locks: &self.site_locks,
            site: site.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn is_fallback(&self, site: &SiteName) -> bool {
        self.fallback_site.read().await.as_ref() == Some(site)
    }

    /// Registered context for `site`, creating it under the site lock if
    /// needed.
    async fn get_or_create(&self, site: &SiteName, fallback: bool) -> SitelineResult<Arc<SiteContext>> {
        if let Some(ctx) = self.registry.get(site) {
            return Ok(ctx);
        }

        let _guard = self.lock_site(site).await;

        // Another task may have finished creating it while we waited.
        if let Some(ctx) = self.registry.get(site) {
            return Ok(ctx);
        }

        let ctx = Arc::new(self.factory.create_context(site, fallback).await?);
        self.registry.register(Arc::clone(&ctx));
        Ok(ctx)
    }

    /// The current context for `site`.
    ///
    /// Unknown sites are created lazily. A site whose store cannot be opened
    /// resolves to the fallback context when `allow_fallback` is set and a
    /// fallback site is configured, otherwise to `ContextError::NotFound`.
    /// Other creation failures (bad config, I/O) propagate.
    pub async fn get_context(
        &self,
        site: &SiteName,
        allow_fallback: bool,
    ) -> SitelineResult<Arc<SiteContext>> {
        let fallback = self.is_fallback(site).await;
        match self.get_or_create(site, fallback).await {
            Ok(ctx) => Ok(ctx),
            Err(SitelineError::Store(StoreError::InvalidContext { reason, .. })) => {
                tracing::debug!(site = %site, reason = %reason, "Site has no usable store");
                if allow_fallback {
                    if let Some(fallback_site) = self.fallback_site().await {
                        if &fallback_site != site {
                            return self.get_or_create(&fallback_site, true).await;
                        }
                    }
                }
                Err(ContextError::NotFound {
                    site: site.to_string(),
                }
                .into())
            }
            Err(e) => Err(e),
        }
    }

    /// Snapshot of every registered context.
    pub fn list_contexts(&self) -> Vec<Arc<SiteContext>> {
        self.registry.list_contexts()
    }

    /// Replace the context for `site` with a freshly built one.
    ///
    /// The replacement is built before anything is touched. If building
    /// fails the current context (if any) stays registered and
    /// `ContextError::RebuildFailed` is returned. On success the new context
    /// is registered and the old one destroyed before this returns.
    pub async fn rebuild_context(
        &self,
        site: &SiteName,
        is_fallback: bool,
    ) -> SitelineResult<Arc<SiteContext>> {
        let _guard = self.lock_site(site).await;

        let replacement = match self.factory.create_context(site, is_fallback).await {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                tracing::error!(
                    site = %site,
                    error = %e,
                    kept_previous = self.registry.contains(site),
                    "Site context rebuild failed"
                );
                return Err(ContextError::RebuildFailed {
                    site: site.to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        if let Some(previous) = self.registry.register(Arc::clone(&replacement)) {
            if !Arc::ptr_eq(&previous, &replacement) {
                previous.destroy();
            }
        }

        tracing::info!(
            site = %site,
            fallback = is_fallback,
            built_at = %replacement.built_at(),
            "Site context rebuilt"
        );
        Ok(replacement)
    }

    /// Eagerly create contexts for `sites`, skipping ones already registered.
    /// Failures are logged and skipped. Returns how many were created.
    pub async fn create_contexts(&self, sites: &[SiteName]) -> usize {
        let mut created = 0;
        for site in sites {
            if self.registry.contains(site) {
                continue;
            }
            let fallback = self.is_fallback(site).await;
            match self.get_or_create(site, fallback).await {
                Ok(_) => created += 1,
                Err(e) => {
                    tracing::error!(site = %site, error = %e, "Failed to create site context");
                }
            }
        }
        tracing::info!(requested = sites.len(), created, "Site contexts created");
        created
    }

    /// Unregister and destroy the context for `site`. Returns whether one
    /// existed.
    pub async fn destroy_context(&self, site: &SiteName) -> bool {
        let _guard = self.lock_site(site).await;

        match self.registry.unregister(site) {
            Some(ctx) => {
                ctx.destroy();
                true
            }
            None => false,
        }
    }

    /// Destroy every registered context.
    pub async fn destroy_all(&self) -> usize {
        let mut destroyed = 0;
        for site in self.registry.site_names() {
            if self.destroy_context(&site).await {
                destroyed += 1;
            }
        }
        tracing::info!(destroyed, "All site contexts destroyed");
        destroyed
    }
}

/// Held site lock. On release the site's entry leaves the lock map unless
/// another task still holds or waits on it, so the map only ever holds
/// sites with work in flight.
struct SiteLockGuard<'a> {
    locks: &'a DashMap<SiteName, Arc<Mutex<()>>>,
    site: SiteName,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SiteLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.site, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for SiteContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteContextManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
