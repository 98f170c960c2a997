//! Caching store adapter.
//!
//! Wraps any adapter and routes `find_file` / `get_children` through the
//! [`CacheTemplate`], keyed by the store context's cache scope. Results are
//! equivalent to calling the wrapped adapter directly; only the number of
//! underlying calls changes.

use std::sync::Arc;

use async_trait::async_trait;
use siteline_core::{
    normalize_path, CachingOptions, ContentItem, Listing, SiteName, SitelineResult,
};

use crate::adapter::{ContentStoreAdapter, StoreContext};
use crate::cache::CacheTemplate;
use crate::decorator::AdapterDecorator;

/// Cache operation name for `find_file`.
pub const FIND_FILE_OP: &str = "findFile";

/// Cache operation name for `get_children`.
pub const GET_CHILDREN_OP: &str = "getChildren";

/// Decorator adding the cache template in front of the wrapped adapter.
#[derive(Debug, Clone)]
pub struct CachingDecorator {
    cache: Arc<CacheTemplate>,
}

impl CachingDecorator {
    pub fn new(cache: Arc<CacheTemplate>) -> Self {
        Self { cache }
    }
}

impl AdapterDecorator for CachingDecorator {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn decorate(&self, inner: Arc<dyn ContentStoreAdapter>) -> Arc<dyn ContentStoreAdapter> {
        Arc::new(CachedStoreAdapter::new(inner, Arc::clone(&self.cache)))
    }
}

/// Store adapter that checks the cache template before the wrapped adapter.
///
/// Absent results are cached as well, so repeated lookups of missing paths
/// don't hit the store either. Listings come back tagged as cached views.
#[derive(Clone)]
pub struct CachedStoreAdapter {
    /// The wrapped adapter.
    inner: Arc<dyn ContentStoreAdapter>,
    /// The cache template.
    cache: Arc<CacheTemplate>,
}

impl CachedStoreAdapter {
    pub fn new(inner: Arc<dyn ContentStoreAdapter>, cache: Arc<CacheTemplate>) -> Self {
        Self { inner, cache }
    }

    /// Get a reference to the cache template.
    pub fn cache(&self) -> &CacheTemplate {
        &self.cache
    }
}

#[async_trait]
impl ContentStoreAdapter for CachedStoreAdapter {
    fn name(&self) -> &'static str {
        "caching"
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
        let options = CachingOptions::resolve(options);
        if !options.do_caching {
            return self.inner.find_file(context, Some(&options), path).await;
        }

        let path = normalize_path(path)?;
        let inner = &self.inner;
        self.cache
            .get_object(
                context.cache_scope(),
                Some(&options),
                FIND_FILE_OP,
                &[path.as_str()],
                || async { inner.find_file(context, Some(&options), &path).await },
            )
            .await
    }

    async fn get_children(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>> {
        let options = CachingOptions::resolve(options);
        if !options.do_caching {
            return self.inner.get_children(context, Some(&options), path).await;
        }

        let path = normalize_path(path)?;
        let inner = &self.inner;
        self.cache
            .get_object(
                context.cache_scope(),
                Some(&options),
                GET_CHILDREN_OP,
                &[path.as_str()],
                || async {
                    Ok(inner
                        .get_children(context, Some(&options), &path)
                        .await?
                        .map(Listing::into_cached))
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorator::build_adapter_chain;
    use crate::memory::InMemoryStoreAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls reaching the base adapter.
    struct Counting {
        inner: InMemoryStoreAdapter,
        finds: AtomicUsize,
        lists: AtomicUsize,
    }

    #[async_trait]
    impl ContentStoreAdapter for Counting {
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
            self.inner.find_file(context, options, path).await
        }

        async fn get_children(
            &self,
            context: &StoreContext,
            options: Option<&CachingOptions>,
            path: &str,
        ) -> SitelineResult<Option<Listing>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.get_children(context, options, path).await
        }
    }

    async fn setup() -> (Arc<Counting>, Arc<dyn ContentStoreAdapter>, StoreContext) {
        let memory = InMemoryStoreAdapter::new();
        memory.put_file("acme", "/site/index.xml", "home").unwrap();
        memory.put_file("acme", "/site/about.xml", "about").unwrap();
        let base = Arc::new(Counting {
            inner: memory,
            finds: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
        });
        let decorators: Vec<Arc<dyn AdapterDecorator>> = vec![Arc::new(CachingDecorator::new(
            Arc::new(CacheTemplate::in_memory()),
        ))];
        let chain = build_adapter_chain(base.clone(), &decorators);
        let ctx = chain
            .create_context(&SiteName::new("acme").unwrap(), "acme")
            .await
            .unwrap();
        (base, chain, ctx)
    }

    #[tokio::test]
    async fn test_find_file_cached_round_trip() {
        let (base, chain, ctx) = setup().await;

        let first = chain.find_file(&ctx, None, "/site/index.xml").await.unwrap();
        let second = chain.find_file(&ctx, None, "site//index.xml").await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_some());
        assert_eq!(base.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_bump_causes_miss() {
        let (base, chain, ctx) = setup().await;

        chain.find_file(&ctx, None, "/site/index.xml").await.unwrap();
        ctx.cache_scope().bump();
        chain.find_file(&ctx, None, "/site/index.xml").await.unwrap();

        assert_eq!(base.finds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_absent_results_are_cached() {
        let (base, chain, ctx) = setup().await;

        assert!(chain.find_file(&ctx, None, "/nope").await.unwrap().is_none());
        assert!(chain.find_file(&ctx, None, "/nope").await.unwrap().is_none());
        assert!(!chain.exists(&ctx, None, "/nope").await.unwrap());

        assert_eq!(base.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_options_bypass_cache() {
        let (base, chain, ctx) = setup().await;
        let disabled = CachingOptions::disabled();

        chain.find_file(&ctx, Some(&disabled), "/site/index.xml").await.unwrap();
        chain.find_file(&ctx, Some(&disabled), "/site/index.xml").await.unwrap();

        assert_eq!(base.finds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_listing_is_tagged_and_cached() {
        let (base, chain, ctx) = setup().await;

        let first = chain.get_children(&ctx, None, "/site").await.unwrap().unwrap();
        let second = chain.get_children(&ctx, None, "/site").await.unwrap().unwrap();

        assert!(first.is_cached_view());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(base.lists.load(Ordering::SeqCst), 1);

        let fresh = chain
            .get_children(&ctx, Some(&CachingOptions::disabled()), "/site")
            .await
            .unwrap()
            .unwrap();
        assert!(!fresh.is_cached_view());
    }

    #[tokio::test]
    async fn test_get_content_goes_through_cache() {
        let (base, chain, ctx) = setup().await;

        let a = chain.get_content(&ctx, None, "/site/about.xml").await.unwrap();
        let b = chain.get_content(&ctx, None, "/site/about.xml").await.unwrap();

        assert_eq!(a, Some(b"about".to_vec()));
        assert_eq!(a, b);
        assert_eq!(base.finds.load(Ordering::SeqCst), 1);
    }
}
