//! In-memory store adapter.
//!
//! Holds one content tree per store root. Used for tests, demos, and sites
//! whose content is pushed in programmatically.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use siteline_core::{
    normalize_path, CachingOptions, ContentItem, Listing, SiteName, SitelineResult, StoreError,
};

use crate::adapter::{ContentStoreAdapter, StoreContext};

type Tree = BTreeMap<String, ContentItem>;

/// Store adapter backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryStoreAdapter {
    trees: DashMap<String, Tree>,
}

impl InMemoryStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file under `root`, creating parent folders as needed.
    pub fn put_file(
        &self,
        root: &str,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> SitelineResult<()> {
        let path = normalize_path(path)?;
        let mut tree = self.trees.entry(root.to_string()).or_default();
        ensure_parents(&mut tree, &path);
        tree.insert(
            path.clone(),
            ContentItem::file(path, content).with_last_modified(Utc::now()),
        );
        Ok(())
    }

    /// Create a folder under `root`, with its parents.
    pub fn put_folder(&self, root: &str, path: &str) -> SitelineResult<()> {
        let path = normalize_path(path)?;
        let mut tree = self.trees.entry(root.to_string()).or_default();
        ensure_parents(&mut tree, &path);
        tree.entry(path.clone())
            .or_insert_with(|| ContentItem::folder(path));
        Ok(())
    }

    /// Remove an item and everything below it. Returns whether anything was
    /// removed.
    pub fn remove(&self, root: &str, path: &str) -> SitelineResult<bool> {
        let path = normalize_path(path)?;
        let Some(mut tree) = self.trees.get_mut(root) else {
            return Ok(false);
        };
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let before = tree.len();
        tree.retain(|key, _| key != &path && !key.starts_with(&prefix));
        Ok(tree.len() != before)
    }

    /// Drop a whole store root.
    pub fn remove_root(&self, root: &str) -> bool {
        self.trees.remove(root).is_some()
    }
}

fn ensure_parents(tree: &mut Tree, path: &str) {
    tree.entry("/".to_string())
        .or_insert_with(|| ContentItem::folder("/"));
    let mut current = String::new();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        current.push('/');
        current.push_str(segment);
        tree.entry(current.clone())
            .or_insert_with(|| ContentItem::folder(current.clone()));
    }
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

#[async_trait]
impl ContentStoreAdapter for InMemoryStoreAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_context(&self, site: &SiteName, root: &str) -> SitelineResult<StoreContext> {
        if !self.trees.contains_key(root) {
            return Err(StoreError::InvalidContext {
                site: site.to_string(),
                reason: format!("no content tree at {}", root),
            }
            .into());
        }
        Ok(StoreContext::new(site.clone(), root))
    }

    async fn validate(&self, context: &StoreContext) -> SitelineResult<bool> {
        Ok(self
            .trees
            .get(context.root())
            .map(|tree| tree.contains_key("/"))
            .unwrap_or(false))
    }

    async fn find_file(
        &self,
        context: &StoreContext,
        _options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<ContentItem>> {
        let path = normalize_path(path)?;
        Ok(self
            .trees
            .get(context.root())
            .and_then(|tree| tree.get(&path).cloned()))
    }

    async fn get_children(
        &self,
        context: &StoreContext,
        _options: Option<&CachingOptions>,
        path: &str,
    ) -> SitelineResult<Option<Listing>> {
        let path = normalize_path(path)?;
        let Some(tree) = self.trees.get(context.root()) else {
            return Ok(None);
        };
        match tree.get(&path) {
            Some(item) if item.is_folder() => {}
            _ => return Ok(None),
        }

        let children = tree
            .values()
            .filter(|item| parent_of(&item.path) == Some(path.as_str()))
            .cloned()
            .collect();
        Ok(Some(Listing::new(children)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteName {
        SiteName::new("acme").unwrap()
    }

    #[tokio::test]
    async fn test_put_and_find() {
        let adapter = InMemoryStoreAdapter::new();
        adapter.put_file("acme", "/site/index.xml", "<page/>").unwrap();
        let ctx = adapter.create_context(&site(), "acme").await.unwrap();

        let item = adapter
            .find_file(&ctx, None, "site/index.xml")
            .await
            .unwrap()
            .expect("file should exist");
        assert_eq!(item.content_str(), Some("<page/>"));

        let folder = adapter.find_file(&ctx, None, "/site").await.unwrap().unwrap();
        assert!(folder.is_folder());

        assert!(adapter.find_file(&ctx, None, "/missing").await.unwrap().is_none());
        assert!(adapter.exists(&ctx, None, "/site/index.xml").await.unwrap());
        assert_eq!(
            adapter.get_content(&ctx, None, "/site/index.xml").await.unwrap(),
            Some(b"<page/>".to_vec())
        );
    }

    #[tokio::test]
    async fn test_get_children_lists_direct_children_only() {
        let adapter = InMemoryStoreAdapter::new();
        adapter.put_file("acme", "/site/a.xml", "a").unwrap();
        adapter.put_file("acme", "/site/b.xml", "b").unwrap();
        adapter.put_file("acme", "/site/nested/c.xml", "c").unwrap();
        let ctx = adapter.create_context(&site(), "acme").await.unwrap();

        let listing = adapter
            .get_children(&ctx, None, "/site")
            .await
            .unwrap()
            .expect("folder should list");
        let names: Vec<&str> = listing.items().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["a.xml", "b.xml", "nested"]);
        assert!(!listing.is_cached_view());

        let root = adapter.get_children(&ctx, None, "/").await.unwrap().unwrap();
        assert_eq!(root.len(), 1);

        assert!(adapter
            .get_children(&ctx, None, "/site/a.xml")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_create_context_requires_tree() {
        let adapter = InMemoryStoreAdapter::new();
        let err = adapter.create_context(&site(), "nowhere").await.unwrap_err();
        assert!(matches!(
            err,
            siteline_core::SitelineError::Store(StoreError::InvalidContext { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_and_validate() {
        let adapter = InMemoryStoreAdapter::new();
        adapter.put_file("acme", "/site/a.xml", "a").unwrap();
        let ctx = adapter.create_context(&site(), "acme").await.unwrap();
        assert!(adapter.validate(&ctx).await.unwrap());

        assert!(adapter.remove("acme", "/site").unwrap());
        assert!(adapter.find_file(&ctx, None, "/site/a.xml").await.unwrap().is_none());

        adapter.remove_root("acme");
        assert!(!adapter.validate(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_roots_are_isolated() {
        let adapter = InMemoryStoreAdapter::new();
        adapter.put_file("acme", "/index.xml", "acme").unwrap();
        adapter.put_file("globex", "/index.xml", "globex").unwrap();

        let acme = adapter.create_context(&site(), "acme").await.unwrap();
        let globex = adapter
            .create_context(&SiteName::new("globex").unwrap(), "globex")
            .await
            .unwrap();

        let a = adapter.get_content(&acme, None, "/index.xml").await.unwrap();
        let g = adapter.get_content(&globex, None, "/index.xml").await.unwrap();
        assert_eq!(a, Some(b"acme".to_vec()));
        assert_eq!(g, Some(b"globex".to_vec()));
    }
}
