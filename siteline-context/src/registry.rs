//! Registry of live site contexts.

use std::sync::Arc;

use dashmap::DashMap;
use siteline_core::SiteName;

use crate::site_context::SiteContext;

/// Concurrent map from site name to the one current context for that site.
///
/// Reads dominate; writes happen once per build or rebuild. DashMap's
/// per-shard locks keep a registration for one site from blocking lookups
/// of another.
#[derive(Debug, Default)]
pub struct SiteContextRegistry {
    contexts: DashMap<SiteName, Arc<SiteContext>>,
}

impl SiteContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `context` as the current one for its site, returning whatever it
    /// replaced. Last write wins; callers rebuilding a site must serialize
    /// among themselves.
    pub fn register(&self, context: Arc<SiteContext>) -> Option<Arc<SiteContext>> {
        let name = context.site_name().clone();
        let previous = self.contexts.insert(name.clone(), Arc::clone(&context));

        match &previous {
            Some(prev) if Arc::ptr_eq(prev, &context) => {
                tracing::trace!(site = %name, "Site context already registered");
            }
            Some(_) => {
                tracing::debug!(site = %name, "Site context superseded");
            }
            None => {
                tracing::debug!(site = %name, "Site context registered");
            }
        }
        previous
    }

    /// The current context for `name`, if any.
    pub fn get(&self, name: &SiteName) -> Option<Arc<SiteContext>> {
        self.contexts.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove and return the context for `name`. The caller is responsible
    /// for destroying it once readers are done.
    pub fn unregister(&self, name: &SiteName) -> Option<Arc<SiteContext>> {
        let removed = self.contexts.remove(name).map(|(_, ctx)| ctx);
        if removed.is_some() {
            tracing::debug!(site = %name, "Site context unregistered");
        }
        removed
    }

    /// Point-in-time snapshot of the live contexts. Concurrent writers may or
    /// may not be reflected, but iteration never fails.
    pub fn list_contexts(&self) -> Vec<Arc<SiteContext>> {
        self.contexts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Sorted names of the registered sites.
    pub fn site_names(&self) -> Vec<SiteName> {
        let mut names: Vec<SiteName> = self.contexts.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &SiteName) -> bool {
        self.contexts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
