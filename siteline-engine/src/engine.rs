//! Engine bootstrap: wires the store, cache, manager and watcher together.

use std::sync::Arc;

use siteline_context::{DefaultSiteContextFactory, SiteContextManager};
use siteline_storage::{CacheTemplate, ContentStoreAdapter, FileSystemStoreAdapter};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::jobs::{deployment_events_task, DeploymentEventsMetrics, DeploymentEventsWatcher};
use crate::sites::discover_sites;

/// A running set of site contexts plus the watcher that keeps them current.
pub struct Engine {
    config: EngineConfig,
    cache: Arc<CacheTemplate>,
    manager: Arc<SiteContextManager>,
    watcher: Arc<DeploymentEventsWatcher>,
}

impl Engine {
    /// Engine over the filesystem, one directory per site under
    /// `config.sites_root`.
    pub async fn new(config: EngineConfig) -> Self {
        let root_template = config.site_root_template();
        Self::with_store(config, Arc::new(FileSystemStoreAdapter::new()), root_template).await
    }

    /// Engine over any base store adapter.
    pub async fn with_store(
        config: EngineConfig,
        base: Arc<dyn ContentStoreAdapter>,
        root_template: String,
    ) -> Self {
        let cache = Arc::new(CacheTemplate::in_memory());
        let factory = DefaultSiteContextFactory::new(base, Arc::clone(&cache))
            .with_root_template(root_template)
            .with_caching(config.cache_enabled);

        let manager = Arc::new(SiteContextManager::new(Arc::new(factory)));
        manager.set_fallback_site(config.fallback_site.clone()).await;

        let watcher = Arc::new(DeploymentEventsWatcher::new(
            Arc::clone(&manager),
            &config.deployment_events,
        ));

        Self {
            config,
            cache,
            manager,
            watcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheTemplate> {
        &self.cache
    }

    pub fn manager(&self) -> &Arc<SiteContextManager> {
        &self.manager
    }

    pub fn watcher(&self) -> &Arc<DeploymentEventsWatcher> {
        &self.watcher
    }

    /// Discover the sites on disk and build their contexts. Returns how many
    /// were built.
    pub async fn load_sites(&self) -> EngineResult<usize> {
        let sites = discover_sites(&self.config.sites_root).await?;
        tracing::info!(
            root = %self.config.sites_root.display(),
            discovered = sites.len(),
            "Loading sites"
        );
        Ok(self.manager.create_contexts(&sites).await)
    }

    /// Spawn the deployment events watcher on the current runtime.
    pub fn spawn_watcher(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<Arc<DeploymentEventsMetrics>> {
        tokio::spawn(deployment_events_task(
            Arc::clone(&self.watcher),
            self.config.deployment_events.clone(),
            shutdown_rx,
        ))
    }

    /// Destroy every context.
    pub async fn shutdown(&self) {
        let destroyed = self.manager.destroy_all().await;
        let stats = self.cache.stats();
        tracing::info!(
            destroyed,
            hits = stats.hits,
            misses = stats.misses,
            hit_rate = stats.hit_rate(),
            "Engine shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteline_core::SiteName;
    use std::time::Duration;

    fn engine_config(root: &std::path::Path) -> EngineConfig {
        EngineConfig {
            sites_root: root.to_path_buf(),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_load_sites_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        for site in ["acme", "globex"] {
            std::fs::create_dir_all(dir.path().join(site).join("site")).unwrap();
            std::fs::write(dir.path().join(site).join("site/index.xml"), site).unwrap();
        }

        let engine = Engine::new(engine_config(dir.path())).await;
        assert_eq!(engine.load_sites().await.unwrap(), 2);

        let acme = engine
            .manager()
            .get_context(&SiteName::new("acme").unwrap(), false)
            .await
            .unwrap();
        let content = acme
            .store_adapter()
            .get_content(acme.store_context(), None, "/site/index.xml")
            .await
            .unwrap();
        assert_eq!(content, Some(b"acme".to_vec()));

        engine.shutdown().await;
        assert!(engine.manager().list_contexts().is_empty());
        assert!(!acme.is_valid());
    }

    #[tokio::test]
    async fn test_fallback_site_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("default")).unwrap();
        let config = EngineConfig {
            fallback_site: Some(SiteName::new("default").unwrap()),
            ..engine_config(dir.path())
        };

        let engine = Engine::new(config).await;
        let ctx = engine
            .manager()
            .get_context(&SiteName::new("unknown").unwrap(), true)
            .await
            .unwrap();

        assert!(ctx.is_fallback());
        assert_eq!(ctx.site_name().as_str(), "default");
    }

    #[tokio::test]
    async fn test_watcher_stops_on_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = engine_config(dir.path());
        config.deployment_events.check_interval = Duration::from_millis(10);

        let engine = Engine::new(config).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = engine.spawn_watcher(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher should stop")
            .unwrap();

        assert!(metrics.snapshot().cycles >= 1);
    }
}
