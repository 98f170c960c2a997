//! Content store adapter contract.
//!
//! A store adapter performs raw lookups against one backing store. Every
//! call carries the [`StoreContext`] it runs against, so adapters and the
//! decorators wrapped around them stay free of per-site state.

use std::sync::Arc;

use async_trait::async_trait;
use siteline_core::{CachingOptions, ContentItem, Listing, SiteName, SitelineResult};
use uuid::Uuid;

use crate::cache::CacheScope;

/// Handle to one site's backing store.
///
/// Cheap to clone: the cache scope is shared, so every clone observes the
/// same version.
#[derive(Debug, Clone)]
pub struct StoreContext {
    id: Uuid,
    site: SiteName,
    root: String,
    cache_scope: Arc<CacheScope>,
}

impl StoreContext {
    /// Create a store context with a fresh cache scope.
    pub fn new(site: SiteName, root: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            site,
            root: root.into(),
            cache_scope: Arc::new(CacheScope::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn site(&self) -> &SiteName {
        &self.site
    }

    /// Backend-specific root (a directory, a bucket prefix, a tree name).
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn cache_scope(&self) -> &CacheScope {
        &self.cache_scope
    }
}

/// Raw access to a site's content.
///
/// `find_file` and `get_children` are the primitives; `exists` and
/// `get_content` default to going through `find_file` so decorators that
/// override the primitives get them for free. Absent content is `Ok(None)`,
/// never an error.
#[async_trait]
pub trait ContentStoreAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Open a store context for a site rooted at `root`.
    async fn create_context(&self, site: &SiteName, root: &str) -> SitelineResult<StoreContext>;

    /// Whether the context still points at a usable store.
    async fn validate(&self, context: &StoreContext) -> SitelineResult<bool>;

    /// Look up a single item.
    async fn find_file(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<ContentItem>>;

    /// List a folder's children, or `None` if `path` is not a folder.
    async fn get_children(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>>;

    async fn exists(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<bool> {
        Ok(self.find_file(context, options, path).await?.is_some())
    }

    async fn get_content(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Vec<u8>>> {
        Ok(self
            .find_file(context, options, path)
            .await?
            .and_then(|item| item.content))
    }
}

/// Read a resource with caching forced off, whatever decorators the adapter
/// carries.
pub async fn read_uncached(
    adapter: &dyn ContentStoreAdapter,
    context: &StoreContext,
    path: &str,
) -> SitelineResult<Option<Vec<u8>>> {
    adapter
        .get_content(context, Some(&CachingOptions::disabled()), path)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_context_clones_share_scope() {
        let ctx = StoreContext::new(SiteName::new("acme").unwrap(), "/srv/acme");
        let clone = ctx.clone();

        ctx.cache_scope().bump();

        assert_eq!(clone.cache_scope().version(), 1);
        assert_eq!(clone.id(), ctx.id());
        assert_eq!(clone.root(), "/srv/acme");
        assert_eq!(clone.site().as_str(), "acme");
    }

    #[test]
    fn test_new_contexts_get_new_scopes() {
        let site = SiteName::new("acme").unwrap();
        let a = StoreContext::new(site.clone(), "/srv/acme");
        let b = StoreContext::new(site, "/srv/acme");
        assert_ne!(a.cache_scope().id(), b.cache_scope().id());
    }
}
