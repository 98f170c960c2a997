//! Deployment Events Watcher
//!
//! A background task that polls every registered site for its deployment
//! marker and reacts to it. A deployment writes the marker into the site's
//! store with one or both of:
//!
//! - `events.deployment.rebuildContext=<instant>`: rebuild the whole site
//!   context (re-reading its configuration)
//! - `events.deployment.clearCache=<instant>`: drop every cached entry of
//!   the site
//!
//! An event fires only when its instant is strictly later than the instant
//! the context last observed for it, so polling the same marker twice is a
//! no-op. A rebuild gives the site a fresh cache scope, so an explicit clear
//! is skipped in the same cycle.
//!
//! # Configuration
//!
//! ```rust
//! use siteline_engine::jobs::DeploymentEventsConfig;
//! use std::time::Duration;
//!
//! let config = DeploymentEventsConfig {
//!     check_interval: Duration::from_secs(30),
//!     marker_path: "deployment-events.properties".to_string(),
//!     enabled: true,
//! };
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use siteline_context::{with_site, SiteContext, SiteContextManager};
use siteline_core::{
    DeploymentEvents, EventError, SiteEventKind, SiteName, SitelineResult, Timestamp,
    DEFAULT_DEPLOYMENT_EVENTS_PATH,
};
use siteline_storage::read_uncached;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::{
    DEFAULT_DEPLOYMENT_EVENTS_INTERVAL_SECS, DEVELOPMENT_DEPLOYMENT_EVENTS_INTERVAL_SECS,
    ENV_DEPLOYMENT_EVENTS_ENABLED, ENV_DEPLOYMENT_EVENTS_INTERVAL_SECS,
    ENV_DEPLOYMENT_EVENTS_PATH,
};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the deployment events watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentEventsConfig {
    /// How often to poll every site (default: 30 seconds)
    pub check_interval: Duration,

    /// Marker path relative to each site's store root, unless the site
    /// overrides it (default: deployment-events.properties)
    pub marker_path: String,

    /// Whether the watcher runs at all (default: true)
    pub enabled: bool,
}

impl Default for DeploymentEventsConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_DEPLOYMENT_EVENTS_INTERVAL_SECS),
            marker_path: DEFAULT_DEPLOYMENT_EVENTS_PATH.to_string(),
            enabled: true,
        }
    }
}

impl DeploymentEventsConfig {
    /// Create DeploymentEventsConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SITELINE_DEPLOYMENT_EVENTS_INTERVAL_SECS`: Poll interval (default: 30)
    /// - `SITELINE_DEPLOYMENT_EVENTS_PATH`: Marker path (default: deployment-events.properties)
    /// - `SITELINE_DEPLOYMENT_EVENTS_ENABLED`: Run the watcher (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let check_interval = Duration::from_secs(
            lookup(ENV_DEPLOYMENT_EVENTS_INTERVAL_SECS)
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_DEPLOYMENT_EVENTS_INTERVAL_SECS),
        );

        let marker_path = lookup(ENV_DEPLOYMENT_EVENTS_PATH)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_EVENTS_PATH.to_string());

        let enabled = lookup(ENV_DEPLOYMENT_EVENTS_ENABLED)
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            check_interval,
            marker_path,
            enabled,
        }
    }

    /// Create a configuration for local development with a short interval.
    pub fn development() -> Self {
        Self {
            check_interval: Duration::from_secs(DEVELOPMENT_DEPLOYMENT_EVENTS_INTERVAL_SECS),
            ..Self::default()
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for watcher activity since startup.
#[derive(Debug, Default)]
pub struct DeploymentEventsMetrics {
    /// Completed poll cycles
    pub cycles: AtomicU64,

    /// Per-site checks attempted
    pub sites_checked: AtomicU64,

    /// Contexts rebuilt in response to a marker
    pub rebuilds: AtomicU64,

    /// Caches cleared in response to a marker
    pub cache_clears: AtomicU64,

    /// Per-site checks that failed
    pub errors: AtomicU64,
}

impl DeploymentEventsMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> DeploymentEventsSnapshot {
        DeploymentEventsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            sites_checked: self.sites_checked.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            cache_clears: self.cache_clears.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of watcher metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentEventsSnapshot {
    pub cycles: u64,
    pub sites_checked: u64,
    pub rebuilds: u64,
    pub cache_clears: u64,
    pub errors: u64,
}

// ============================================================================
// WATCHER
// ============================================================================

/// What a single site check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteEventOutcome {
    /// No marker, nothing newer than what the context already saw, or the
    /// context was superseded before its turn came.
    NoEvents,
    /// The context was replaced.
    Rebuilt { requested_at: Timestamp },
    /// The context's cache version was bumped.
    CacheCleared { requested_at: Timestamp, version: u64 },
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub checked: usize,
    pub rebuilt: Vec<SiteName>,
    pub cache_cleared: Vec<SiteName>,
    pub failures: Vec<SiteName>,
}

/// Polls the manager's contexts for deployment markers.
pub struct DeploymentEventsWatcher {
    manager: Arc<SiteContextManager>,
    marker_path: String,
    metrics: Arc<DeploymentEventsMetrics>,
}

impl DeploymentEventsWatcher {
    pub fn new(manager: Arc<SiteContextManager>, config: &DeploymentEventsConfig) -> Self {
        Self {
            manager,
            marker_path: config.marker_path.clone(),
            metrics: Arc::new(DeploymentEventsMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<DeploymentEventsMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Marker path for `context`: the site's own override, else the default.
    pub fn marker_path_for<'a>(&'a self, context: &'a SiteContext) -> &'a str {
        context
            .config()
            .deployment_events_path
            .as_deref()
            .unwrap_or(self.marker_path.as_str())
    }

    /// Read the marker for `context`, bypassing every cache. `None` when the
    /// site has no marker.
    pub async fn read_events(&self, context: &SiteContext) -> SitelineResult<Option<DeploymentEvents>> {
        let path = self.marker_path_for(context);
        let bytes = match read_uncached(
            context.store_adapter().as_ref(),
            context.store_context(),
            path,
        )
        .await?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let text = String::from_utf8(bytes).map_err(|e| EventError::Malformed {
            reason: format!("{}: {}", path, e),
        })?;
        Ok(Some(DeploymentEvents::parse(&text)?))
    }

    /// Check one site and act on its marker.
    pub async fn check_site(&self, context: &Arc<SiteContext>) -> SitelineResult<SiteEventOutcome> {
        if !context.is_valid() {
            tracing::debug!(site = %context.site_name(), "Skipping superseded site context");
            return Ok(SiteEventOutcome::NoEvents);
        }

        let Some(events) = self.read_events(context).await? else {
            tracing::trace!(site = %context.site_name(), "No deployment marker");
            return Ok(SiteEventOutcome::NoEvents);
        };

        if let Some(requested_at) = events.rebuild_context {
            if is_newer(requested_at, context.last_event(SiteEventKind::ContextBuilt)) {
                tracing::info!(
                    site = %context.site_name(),
                    requested_at = %requested_at,
                    "Deployment requested context rebuild"
                );
                self.manager
                    .rebuild_context(context.site_name(), context.is_fallback())
                    .await?;
                return Ok(SiteEventOutcome::Rebuilt { requested_at });
            }
        }

        if let Some(requested_at) = events.clear_cache {
            if is_newer(requested_at, context.last_event(SiteEventKind::CacheCleared)) {
                tracing::info!(
                    site = %context.site_name(),
                    requested_at = %requested_at,
                    "Deployment requested cache clear"
                );
                let version = context.clear_cache(requested_at);
                return Ok(SiteEventOutcome::CacheCleared {
                    requested_at,
                    version,
                });
            }
        }

        tracing::debug!(site = %context.site_name(), "Deployment marker already handled");
        Ok(SiteEventOutcome::NoEvents)
    }

    /// One poll cycle over a snapshot of the registered contexts.
    ///
    /// Sites are checked one after another, each bound as the ambient site.
    /// A failing site is logged and counted; the rest are still checked.
    pub async fn check_all(&self) -> CycleReport {
        let contexts = self.manager.list_contexts();
        let mut report = CycleReport::default();

        for context in contexts {
            report.checked += 1;
            self.metrics.sites_checked.fetch_add(1, Ordering::Relaxed);

            let outcome = with_site(Arc::clone(&context), self.check_site(&context)).await;
            match outcome {
                Ok(SiteEventOutcome::NoEvents) => {}
                Ok(SiteEventOutcome::Rebuilt { .. }) => {
                    self.metrics.rebuilds.fetch_add(1, Ordering::Relaxed);
                    report.rebuilt.push(context.site_name().clone());
                }
                Ok(SiteEventOutcome::CacheCleared { .. }) => {
                    self.metrics.cache_clears.fetch_add(1, Ordering::Relaxed);
                    report.cache_cleared.push(context.site_name().clone());
                }
                Err(e) => {
                    tracing::error!(
                        site = %context.site_name(),
                        error = %e,
                        "Deployment events check failed"
                    );
                    self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                    report.failures.push(context.site_name().clone());
                }
            }
        }

        self.metrics.cycles.fetch_add(1, Ordering::Relaxed);
        if report.rebuilt.is_empty() && report.cache_cleared.is_empty() && report.failures.is_empty() {
            tracing::trace!(checked = report.checked, "Deployment events cycle completed with no events");
        } else {
            tracing::info!(
                checked = report.checked,
                rebuilt = report.rebuilt.len(),
                cache_cleared = report.cache_cleared.len(),
                failures = report.failures.len(),
                "Deployment events cycle completed"
            );
        }
        report
    }
}

/// Strictly-after comparison; an event never observed counts as older than
/// anything.
fn is_newer(requested_at: Timestamp, last_seen: Option<Timestamp>) -> bool {
    last_seen.map_or(true, |seen| requested_at > seen)
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task polling deployment markers until shutdown.
///
/// Returns the watcher's metrics once the shutdown signal is received. A
/// disabled config returns immediately.
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let watcher = Arc::new(DeploymentEventsWatcher::new(manager, &config));
/// let handle = tokio::spawn(deployment_events_task(watcher, config, shutdown_rx));
///
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn deployment_events_task(
    watcher: Arc<DeploymentEventsWatcher>,
    config: DeploymentEventsConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<DeploymentEventsMetrics> {
    let metrics = watcher.metrics();
    if !config.enabled {
        tracing::info!("Deployment events watcher disabled");
        return metrics;
    }

    let mut poll_interval = interval(config.check_interval);
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        check_interval_secs = config.check_interval.as_secs(),
        marker_path = %config.marker_path,
        "Deployment events watcher started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Deployment events watcher shutting down");
                    break;
                }
            }

            _ = poll_interval.tick() => {
                watcher.check_all().await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        sites_checked = snapshot.sites_checked,
        rebuilds = snapshot.rebuilds,
        cache_clears = snapshot.cache_clears,
        errors = snapshot.errors,
        "Deployment events watcher completed"
    );

    metrics
}

// ============================================================================
// TESTS
// ============================================================================
