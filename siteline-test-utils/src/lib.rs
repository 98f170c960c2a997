//! Siteline Test Utilities
//!
//! Shared test infrastructure for the Siteline workspace:
//! - Store adapters that count or fail calls
//! - Proptest generators for site names, paths and markers
//! - Fixtures for seeded stores and managers
//! - Assertions for Siteline-specific error shapes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

pub use siteline_core::{
    CachingOptions, ContentItem, ContextError, DeploymentEvents, Listing, SiteEventKind,
    SiteName, SitelineError, SitelineResult, StoreError, Timestamp,
    DEFAULT_DEPLOYMENT_EVENTS_PATH, SITE_CONFIG_PATH,
};
pub use siteline_context::{DefaultSiteContextFactory, SiteContext, SiteContextManager};
pub use siteline_storage::{CacheTemplate, ContentStoreAdapter, InMemoryStoreAdapter, StoreContext};

// ============================================================================
// STORE ADAPTERS
// ============================================================================

/// Delegating adapter that counts the calls reaching it.
///
/// Put it at the base of a chain to see how many lookups the decorators
/// above it let through.
pub struct CountingStoreAdapter {
    inner: Arc<dyn ContentStoreAdapter>,
    finds: AtomicUsize,
    lists: AtomicUsize,
    by_path: DashMap<String, usize>,
}

impl CountingStoreAdapter {
    pub fn new(inner: Arc<dyn ContentStoreAdapter>) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            by_path: DashMap::new(),
        }
    }

    /// Total `find_file` calls.
    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Total `get_children` calls.
    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Calls of either kind for `path`, as passed in.
    pub fn calls_for(&self, path: &str) -> usize {
        self.by_path.get(path).map(|c| *c).unwrap_or(0)
    }

    pub fn reset(&self) {
        self.finds.store(0, Ordering::SeqCst);
        self.lists.store(0, Ordering::SeqCst);
        self.by_path.clear();
    }

    fn record(&self, path: &str) {
        *self.by_path.entry(path.to_string()).or_insert(0) += 1;
    }
}

#[async_trait]
impl ContentStoreAdapter for CountingStoreAdapter {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn create_context(&self, site: &SiteName, root: &str) -> SitelineResult<StoreContext> {
        self.inner.create_context(site, root).await
    }

    async fn validate(&self, context: &StoreContext) -> SitelineResult<bool> {
        self.inner.validate(context).await
    }

    async fn find_file(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<ContentItem>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.record(path);
        self.inner.find_file(context, options, path).await
    }

    async fn get_children(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.record(path);
        self.inner.get_children(context, options, path).await
    }
}

/// Delegating adapter whose lookups fail for selected store roots.
///
/// Context creation and validation always delegate, so a site can be built
/// and then start failing.
pub struct FailingStoreAdapter {
    inner: Arc<dyn ContentStoreAdapter>,
    failing_roots: DashSet<String>,
}

impl FailingStoreAdapter {
    pub fn new(inner: Arc<dyn ContentStoreAdapter>) -> Self {
        Self {
            inner,
            failing_roots: DashSet::new(),
        }
    }

    /// Make every lookup under `root` fail with a backend error.
    pub fn fail_root(&self, root: impl Into<String>) {
        self.failing_roots.insert(root.into());
    }

    pub fn heal_root(&self, root: &str) {
        self.failing_roots.remove(root);
    }

    fn check(&self, context: &StoreContext) -> SitelineResult<()> {
        if self.failing_roots.contains(context.root()) {
            return Err(StoreError::Backend {
                reason: format!("injected failure for {}", context.root()),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStoreAdapter for FailingStoreAdapter {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn create_context(&self, site: &SiteName, root: &str) -> SitelineResult<StoreContext> {
        self.inner.create_context(site, root).await
    }

    async fn validate(&self, context: &StoreContext) -> SitelineResult<bool> {
        self.inner.validate(context).await
    }

    async fn find_file(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<ContentItem>> {
        self.check(context)?;
        self.inner.find_file(context, options, path).await
    }

    async fn get_children(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>> {
        self.check(context)?;
        self.inner.get_children(context, options, path).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Siteline types.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Generate a valid site name.
    pub fn arb_site_name() -> impl Strategy<Value = SiteName> {
        "[a-z0-9][a-z0-9_\\-.]{0,30}".prop_filter_map("valid site name", |s| SiteName::new(s).ok())
    }

    /// Generate an absolute, already-normalized store path.
    pub fn arb_path() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-z0-9_\\-]{1,10}(\\.[a-z]{1,4})?", 0..5)
            .prop_map(|segments| format!("/{}", segments.join("/")))
    }

    /// Generate a millisecond-precision instant between 2000 and 2100.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (946_684_800_000i64..4_102_444_800_000i64).prop_filter_map("representable instant", |ms| {
            Utc.timestamp_millis_opt(ms).single()
        })
    }

    /// Generate a marker with any combination of the two events.
    pub fn arb_deployment_events() -> impl Strategy<Value = DeploymentEvents> {
        (
            proptest::option::of(arb_timestamp()),
            proptest::option::of(arb_timestamp()),
        )
            .prop_map(|(rebuild_context, clear_cache)| DeploymentEvents {
                rebuild_context,
                clear_cache,
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// Shorthand for a site name known to be valid.
    #[track_caller]
    pub fn site(name: &str) -> SiteName {
        match SiteName::new(name) {
            Ok(site) => site,
            Err(e) => panic!("invalid fixture site name {name:?}: {e}"),
        }
    }

    /// Fill the in-memory store root `site` with a few pages and an asset.
    pub fn seed_site(store: &InMemoryStoreAdapter, site: &str) -> SitelineResult<()> {
        store.put_file(site, "/site/index.xml", format!("<page>{site} home</page>"))?;
        store.put_file(site, "/site/about.xml", format!("<page>{site} about</page>"))?;
        store.put_file(site, "/static/app.css", "body { margin: 0 }")?;
        Ok(())
    }

    /// Write a deployment marker at the default path of `site`.
    pub fn write_marker(
        store: &InMemoryStoreAdapter,
        site: &str,
        events: &DeploymentEvents,
    ) -> SitelineResult<()> {
        store.put_file(site, DEFAULT_DEPLOYMENT_EVENTS_PATH, events.to_properties())
    }

    /// Write the site's `site-config.toml`.
    pub fn write_site_config(
        store: &InMemoryStoreAdapter,
        site: &str,
        toml: &str,
    ) -> SitelineResult<()> {
        store.put_file(site, SITE_CONFIG_PATH, toml)
    }

    /// A manager over `base` where each site's store root is its own name,
    /// with caching on, plus the cache template it shares.
    pub fn test_manager(
        base: Arc<dyn ContentStoreAdapter>,
    ) -> (Arc<CacheTemplate>, Arc<SiteContextManager>) {
        let cache = Arc::new(CacheTemplate::in_memory());
        let factory = DefaultSiteContextFactory::new(base, Arc::clone(&cache));
        (cache, Arc::new(SiteContextManager::new(Arc::new(factory))))
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Siteline-specific results.

    use super::*;

    /// Assert that the result is `ContextError::NotFound`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &SitelineResult<T>) {
        match result {
            Err(SitelineError::Context(ContextError::NotFound { .. })) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    /// Assert that the result is `ContextError::RebuildFailed` for `site`.
    #[track_caller]
    pub fn assert_rebuild_failed<T: std::fmt::Debug>(result: &SitelineResult<T>, site: &str) {
        match result {
            Err(SitelineError::Context(ContextError::RebuildFailed { site: s, .. })) if s == site => {}
            other => panic!("Expected RebuildFailed for {site}, got: {:?}", other),
        }
    }

    /// Assert that two handles point at the same context instance.
    #[track_caller]
    pub fn assert_same_context(a: &Arc<SiteContext>, b: &Arc<SiteContext>) {
        assert!(
            Arc::ptr_eq(a, b),
            "Expected the same context instance, got {:?} and {:?}",
            a,
            b
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_counting_adapter_counts_per_path() {
        let store = Arc::new(InMemoryStoreAdapter::new());
        seed_site(&store, "acme").unwrap();
        let counting = CountingStoreAdapter::new(store);
        let ctx = counting.create_context(&site("acme"), "acme").await.unwrap();

        counting.find_file(&ctx, None, "/site/index.xml").await.unwrap();
        counting.find_file(&ctx, None, "/site/index.xml").await.unwrap();
        counting.get_children(&ctx, None, "/site").await.unwrap();

        assert_eq!(counting.finds(), 2);
        assert_eq!(counting.lists(), 1);
        assert_eq!(counting.calls_for("/site/index.xml"), 2);

        counting.reset();
        assert_eq!(counting.finds(), 0);
        assert_eq!(counting.calls_for("/site/index.xml"), 0);
    }

    #[tokio::test]
    async fn test_failing_adapter_fails_selected_root() {
        let store = Arc::new(InMemoryStoreAdapter::new());
        seed_site(&store, "acme").unwrap();
        let failing = FailingStoreAdapter::new(store);
        let ctx = failing.create_context(&site("acme"), "acme").await.unwrap();

        failing.fail_root("acme");
        let err = failing.find_file(&ctx, None, "/site/index.xml").await.unwrap_err();
        assert!(matches!(err, SitelineError::Store(StoreError::Backend { .. })));

        failing.heal_root("acme");
        assert!(failing.find_file(&ctx, None, "/site/index.xml").await.unwrap().is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_seeded_site_gets_its_own_context(name in arb_site_name()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = Arc::new(InMemoryStoreAdapter::new());
                seed_site(&store, name.as_str()).unwrap();
                let (_cache, manager) = test_manager(store);

                let ctx = manager.get_context(&name, false).await.unwrap();
                assert_eq!(ctx.site_name(), &name);

                let other = site(&format!("{}-other", name.as_str()));
                assertions::assert_not_found(&manager.get_context(&other, true).await);
            });
        }
    }

    proptest! {
        #[test]
        fn prop_generated_paths_are_normalized(path in arb_path()) {
            prop_assert_eq!(siteline_core::normalize_path(&path).unwrap(), path);
        }

        #[test]
        fn prop_generated_markers_parse_back(events in arb_deployment_events()) {
            let parsed = DeploymentEvents::parse(&events.to_properties()).unwrap();
            prop_assert_eq!(parsed, events);
        }
    }
}
