//! Siteline Context - Site Context Lifecycle
//!
//! One long-lived [`SiteContext`] per site, kept in a concurrent
//! [`SiteContextRegistry`] and owned by the [`SiteContextManager`], which
//! builds contexts lazily, rebuilds them atomically from the registry's point
//! of view, and resolves unknown sites to the fallback context. The
//! [`ambient`] module binds a context to a task so work off the request path
//! still runs "as" a site.

pub mod ambient;
pub mod manager;
pub mod registry;
pub mod site_context;

pub use ambient::{
    current, require_current, with_site, with_site_blocking, BindSiteExt, SiteAware,
    SiteAwareExecutor,
};
pub use manager::{
    DefaultSiteContextFactory, SiteContextFactory, SiteContextManager, SITE_NAME_PLACEHOLDER,
};
pub use registry::SiteContextRegistry;
pub use site_context::SiteContext;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use siteline_core::SiteName;
    use siteline_storage::{CacheTemplate, InMemoryStoreAdapter};

    use crate::manager::{DefaultSiteContextFactory, SiteContextFactory};
    use crate::site_context::SiteContext;

    /// A freshly built, unregistered context for `name` over an in-memory
    /// store holding one page.
    pub async fn context_for(name: &str) -> Arc<SiteContext> {
        let store = Arc::new(InMemoryStoreAdapter::new());
        store.put_file(name, "/index.xml", name).unwrap();
        let factory =
            DefaultSiteContextFactory::new(store, Arc::new(CacheTemplate::in_memory()));
        let site = SiteName::new(name).unwrap();
        Arc::new(factory.create_context(&site, false).await.unwrap())
    }
}
