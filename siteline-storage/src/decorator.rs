//! Store adapter decorator chain.
//!
//! A chain is built once by folding decorators over a base adapter. Each
//! decorator receives the adapter to delegate to when it decorates, and the
//! composed result is immutable: there are no setters for the delegate.
//!
//! ```ignore
//! let adapter = build_adapter_chain(
//!     Arc::new(FileSystemStoreAdapter::new()),
//!     &[translating, caching],
//! );
//! // caching(translating(filesystem))
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use siteline_core::{
    normalize_path, CachingOptions, ContentItem, Listing, PathTranslation, SiteName,
    SitelineResult,
};

use crate::adapter::{ContentStoreAdapter, StoreContext};

/// Wraps an adapter with cross-cutting behavior.
///
/// Decorated adapters must not hold site-specific state; everything
/// per-site arrives through the [`StoreContext`] on each call.
pub trait AdapterDecorator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Wrap `inner`, returning the adapter that delegates to it.
    fn decorate(&self, inner: Arc<dyn ContentStoreAdapter>) -> Arc<dyn ContentStoreAdapter>;
}

/// Fold `decorators` over `base` in order: the first decorator wraps the
/// base, the last one is outermost.
pub fn build_adapter_chain(
    base: Arc<dyn ContentStoreAdapter>,
    decorators: &[Arc<dyn AdapterDecorator>],
) -> Arc<dyn ContentStoreAdapter> {
    decorators.iter().fold(base, |inner, decorator| {
        tracing::trace!(
            decorator = decorator.name(),
            inner = inner.name(),
            "Decorating store adapter"
        );
        decorator.decorate(inner)
    })
}

// ============================================================================
// PATH TRANSLATION
// ============================================================================

/// Decorator rewriting a path prefix before delegating.
#[derive(Debug, Clone)]
pub struct TranslatingDecorator {
    translation: PathTranslation,
}

impl TranslatingDecorator {
    pub fn new(translation: PathTranslation) -> Self {
        Self { translation }
    }
}

impl AdapterDecorator for TranslatingDecorator {
    fn name(&self) -> &'static str {
        "translating"
    }

    fn decorate(&self, inner: Arc<dyn ContentStoreAdapter>) -> Arc<dyn ContentStoreAdapter> {
        Arc::new(TranslatingStoreAdapter {
            inner,
            translation: self.translation.clone(),
        })
    }
}

/// Adapter produced by [`TranslatingDecorator`]. Returned items keep the
/// store-side paths.
pub struct TranslatingStoreAdapter {
    inner: Arc<dyn ContentStoreAdapter>,
    translation: PathTranslation,
}

impl TranslatingStoreAdapter {
    fn translate(&self, path: &str) -> SitelineResult<String> {
        let path = normalize_path(path)?;
        let from = self.translation.from.trim_end_matches('/');
        let rest = if from.is_empty() {
            Some(path.as_str())
        } else if path == from {
            Some("")
        } else {
            path.strip_prefix(from).filter(|rest| rest.starts_with('/'))
        };
        match rest {
            Some(rest) => Ok(normalize_path(&format!("{}{}", self.translation.to, rest))?),
            None => Ok(path),
        }
    }
}

#[async_trait]
impl ContentStoreAdapter for TranslatingStoreAdapter {
    fn name(&self) -> &'static str {
        "translating"
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
        let path = self.translate(path)?;
        self.inner.find_file(context, options, &path).await
    }

    async fn get_children(
        &self,
        context: &StoreContext,
        options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>> {
        let path = self.translate(path)?;
        self.inner.get_children(context, options, &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStoreAdapter;
    use siteline_core::{SitelineError, StoreError};
    use std::sync::Mutex;

    /// Records the order in which decorators were applied.
    struct RecordingDecorator {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl AdapterDecorator for RecordingDecorator {
        fn name(&self) -> &'static str {
            self.label
        }

        fn decorate(&self, inner: Arc<dyn ContentStoreAdapter>) -> Arc<dyn ContentStoreAdapter> {
            self.log.lock().unwrap().push(self.label);
            inner
        }
    }

    fn translation(from: &str, to: &str) -> PathTranslation {
        PathTranslation {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_chain_applies_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let decorators: Vec<Arc<dyn AdapterDecorator>> = vec![
            Arc::new(RecordingDecorator {
                label: "first",
                log: Arc::clone(&log),
            }),
            Arc::new(RecordingDecorator {
                label: "second",
                log: Arc::clone(&log),
            }),
        ];

        let chain = build_adapter_chain(Arc::new(InMemoryStoreAdapter::new()), &decorators);

        assert_eq!(chain.name(), "memory");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_empty_chain_is_base() {
        let chain = build_adapter_chain(Arc::new(InMemoryStoreAdapter::new()), &[]);
        assert_eq!(chain.name(), "memory");
    }

    #[tokio::test]
    async fn test_translating_decorator_rewrites_prefix() {
        let base = Arc::new(InMemoryStoreAdapter::new());
        base.put_file("acme", "/sites/acme/index.xml", "home").unwrap();
        let decorators: Vec<Arc<dyn AdapterDecorator>> = vec![Arc::new(
            TranslatingDecorator::new(translation("/site", "/sites/acme")),
        )];
        let chain = build_adapter_chain(base, &decorators);
        let ctx = chain
            .create_context(&SiteName::new("acme").unwrap(), "acme")
            .await
            .unwrap();

        let item = chain.find_file(&ctx, None, "/site/index.xml").await.unwrap();
        assert_eq!(item.and_then(|i| i.content), Some(b"home".to_vec()));

        let listing = chain.get_children(&ctx, None, "/site").await.unwrap().unwrap();
        assert_eq!(listing.len(), 1);

        // Paths outside the prefix pass through, "/sitemap" is not under "/site".
        assert!(chain.find_file(&ctx, None, "/sitemap").await.unwrap().is_none());
        assert!(chain
            .find_file(&ctx, None, "/sites/acme/index.xml")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_translation_target_is_normalized() {
        let base = Arc::new(InMemoryStoreAdapter::new());
        base.put_file("acme", "/content/index.xml", "home").unwrap();
        let ctx = base
            .create_context(&SiteName::new("acme").unwrap(), "acme")
            .await
            .unwrap();

        let chain = build_adapter_chain(
            base.clone(),
            &[Arc::new(TranslatingDecorator::new(translation("/site", "content/")))
                as Arc<dyn AdapterDecorator>],
        );
        let item = chain.find_file(&ctx, None, "/site//index.xml").await.unwrap();
        assert_eq!(item.map(|i| i.path), Some("/content/index.xml".to_string()));

        let escaping = build_adapter_chain(
            base,
            &[Arc::new(TranslatingDecorator::new(translation("/site", "/../outside")))
                as Arc<dyn AdapterDecorator>],
        );
        let err = escaping.find_file(&ctx, None, "/site/index.xml").await.unwrap_err();
        assert!(matches!(
            err,
            SitelineError::Store(StoreError::InvalidPath { .. })
        ));
    }
}
