//! Per-site configuration types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Path of a site's configuration file, relative to its store root.
pub const SITE_CONFIG_PATH: &str = "/config/site-config.toml";

/// Configuration of a single site.
///
/// Loaded from [`SITE_CONFIG_PATH`] every time the site's context is built,
/// so a rebuild is how configuration changes take effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Human-friendly name for logs.
    pub display_name: Option<String>,
    /// Whether store lookups go through the cache template at all.
    pub cache_enabled: bool,
    /// Overrides the engine-wide deployment marker path for this site.
    pub deployment_events_path: Option<String>,
    /// Path prefix rewrite applied by the translating decorator, as
    /// `(from, to)`.
    pub path_translation: Option<PathTranslation>,
    /// Free-form site properties, opaque to the engine.
    pub properties: BTreeMap<String, String>,
}

/// Prefix rewrite applied to every path before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTranslation {
    pub from: String,
    pub to: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            cache_enabled: true,
            deployment_events_path: None,
            path_translation: None,
            properties: BTreeMap::new(),
        }
    }
}

impl SiteConfig {
    /// Parse a TOML document. `source_name` only feeds error messages.
    pub fn from_toml(source_name: &str, input: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = toml::from_str(input).map_err(|e| ConfigError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.deployment_events_path {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "deployment_events_path".to_string(),
                    value: path.clone(),
                    reason: "must not be blank".to_string(),
                });
            }
        }
        if let Some(translation) = &self.path_translation {
            if !translation.from.starts_with('/') || !translation.to.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "path_translation".to_string(),
                    value: format!("{} -> {}", translation.from, translation.to),
                    reason: "both prefixes must be absolute".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = SiteConfig::from_toml("site-config.toml", "").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert!(config.cache_enabled);
    }

    #[test]
    fn test_full_document() {
        let input = r#"
display_name = "ACME Corp"
cache_enabled = false
deployment_events_path = "/meta/events.properties"

[path_translation]
from = "/site"
to = "/sites/acme"

[properties]
locale = "en"
"#;
        let config = SiteConfig::from_toml("site-config.toml", input).unwrap();
        assert_eq!(config.display_name.as_deref(), Some("ACME Corp"));
        assert!(!config.cache_enabled);
        assert_eq!(
            config.deployment_events_path.as_deref(),
            Some("/meta/events.properties")
        );
        assert_eq!(
            config.path_translation,
            Some(PathTranslation {
                from: "/site".to_string(),
                to: "/sites/acme".to_string(),
            })
        );
        assert_eq!(config.property("locale"), Some("en"));
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = SiteConfig::from_toml("acme/site-config.toml", "cache_enabled = \"maybe\"")
            .unwrap_err();
        match err {
            ConfigError::Parse { source_name, .. } => {
                assert_eq!(source_name, "acme/site-config.toml")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_relative_translation_rejected() {
        let input = "[path_translation]\nfrom = \"site\"\nto = \"/x\"\n";
        assert!(SiteConfig::from_toml("site-config.toml", input).is_err());
    }
}
