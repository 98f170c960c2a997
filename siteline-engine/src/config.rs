//! Engine configuration from the environment.

use std::path::PathBuf;

use siteline_core::{ConfigError, SiteName};

use crate::constants::{
    DEFAULT_CACHE_ENABLED, DEFAULT_SITES_ROOT, ENV_CACHE_ENABLED, ENV_FALLBACK_SITE,
    ENV_SITES_ROOT,
};
use crate::jobs::DeploymentEventsConfig;

/// Process-wide settings for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory with one sub-directory per site.
    pub sites_root: PathBuf,

    /// Site whose context answers for unknown sites.
    pub fallback_site: Option<SiteName>,

    /// Whether the caching decorator is installed at all. Sites can still
    /// opt out individually through their own config.
    pub cache_enabled: bool,

    /// Deployment events watcher settings.
    pub deployment_events: DeploymentEventsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sites_root: PathBuf::from(DEFAULT_SITES_ROOT),
            fallback_site: None,
            cache_enabled: DEFAULT_CACHE_ENABLED,
            deployment_events: DeploymentEventsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create EngineConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SITELINE_SITES_ROOT`: Directory holding the sites (default: ./sites)
    /// - `SITELINE_FALLBACK_SITE`: Site serving unknown names (default: none)
    /// - `SITELINE_CACHE_ENABLED`: Install the caching decorator (default: true)
    /// - plus everything `DeploymentEventsConfig::from_env` reads
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let sites_root = lookup(ENV_SITES_ROOT)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SITES_ROOT));

        let fallback_site = match lookup(ENV_FALLBACK_SITE).filter(|s| !s.trim().is_empty()) {
            Some(value) => Some(SiteName::new(value.trim()).map_err(|e| {
                ConfigError::InvalidValue {
                    field: ENV_FALLBACK_SITE.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let cache_enabled = lookup(ENV_CACHE_ENABLED)
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(DEFAULT_CACHE_ENABLED);

        Ok(Self {
            sites_root,
            fallback_site,
            cache_enabled,
            deployment_events: DeploymentEventsConfig::from_lookup(&lookup),
        })
    }

    /// Root template handed to the context factory: `<sites_root>/{siteName}`.
    pub fn site_root_template(&self) -> String {
        self.sites_root
            .join(siteline_context::SITE_NAME_PLACEHOLDER)
            .to_string_lossy()
            .into_owned()
    }
}
