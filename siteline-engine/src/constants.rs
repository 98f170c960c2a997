//! Constants for the Siteline engine
//!
//! Defaults for everything `EngineConfig::from_env` and
//! `DeploymentEventsConfig::from_env` read.

// ============================================================================
// SITES
// ============================================================================

/// Default directory holding one sub-directory per site.
pub const DEFAULT_SITES_ROOT: &str = "./sites";

/// Whether the caching decorator is installed by default.
pub const DEFAULT_CACHE_ENABLED: bool = true;

// ============================================================================
// DEPLOYMENT EVENTS WATCHER
// ============================================================================

/// Default poll interval of the deployment events watcher in seconds.
pub const DEFAULT_DEPLOYMENT_EVENTS_INTERVAL_SECS: u64 = 30;

/// Poll interval used by `DeploymentEventsConfig::development`.
pub const DEVELOPMENT_DEPLOYMENT_EVENTS_INTERVAL_SECS: u64 = 2;

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

pub const ENV_SITES_ROOT: &str = "SITELINE_SITES_ROOT";
pub const ENV_FALLBACK_SITE: &str = "SITELINE_FALLBACK_SITE";
pub const ENV_CACHE_ENABLED: &str = "SITELINE_CACHE_ENABLED";
pub const ENV_DEPLOYMENT_EVENTS_INTERVAL_SECS: &str = "SITELINE_DEPLOYMENT_EVENTS_INTERVAL_SECS";
pub const ENV_DEPLOYMENT_EVENTS_PATH: &str = "SITELINE_DEPLOYMENT_EVENTS_PATH";
pub const ENV_DEPLOYMENT_EVENTS_ENABLED: &str = "SITELINE_DEPLOYMENT_EVENTS_ENABLED";
pub const ENV_LOG_FORMAT: &str = "SITELINE_LOG_FORMAT";

// ============================================================================
// LOGGING
// ============================================================================

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";
