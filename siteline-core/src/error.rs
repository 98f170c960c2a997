//! Error types for Siteline operations

use thiserror::Error;

/// Content store errors.
///
/// Everything in here is treated as transient by the deployment events
/// watcher: it is logged, the site is skipped for the cycle, and the next
/// poll retries naturally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Content not found at {path}")]
    NotFound { path: String },

    #[error("I/O failure at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid store context for site {site}: {reason}")]
    InvalidContext { site: String, reason: String },

    #[error("Store backend error: {reason}")]
    Backend { reason: String },
}

/// Site context lifecycle errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("No site context registered for {site}")]
    NotFound { site: String },

    #[error("Rebuild of site context {site} failed: {reason}")]
    RebuildFailed { site: String, reason: String },

    #[error("No site context is bound to the current task")]
    NoAmbientContext,

    #[error("Site context {site} has been destroyed")]
    Destroyed { site: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
}

/// Deployment marker errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Invalid timestamp for {key}: {value}")]
    InvalidTimestamp { key: String, value: String },

    #[error("Malformed deployment marker: {reason}")]
    Malformed { reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid site name {value:?}: {reason}")]
    InvalidSiteName { value: String, reason: String },
}

/// Master error type for all Siteline errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SitelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl SitelineError {
    /// Whether this is the "no context registered" case, as opposed to a
    /// failure while building one.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Context(ContextError::NotFound { .. }))
    }
}

/// Result type alias for Siteline operations.
pub type SitelineResult<T> = Result<T, SitelineError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_io() {
        let err = StoreError::Io {
            path: "/config/site-config.toml".to_string(),
            reason: "permission denied".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("I/O failure"));
        assert!(msg.contains("/config/site-config.toml"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_context_error_display_rebuild_failed() {
        let err = ContextError::RebuildFailed {
            site: "acme".to_string(),
            reason: "bad config".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("acme"));
        assert!(msg.contains("bad config"));
    }

    #[test]
    fn test_event_error_display_invalid_timestamp() {
        let err = EventError::InvalidTimestamp {
            key: "events.deployment.clearCache".to_string(),
            value: "yesterday".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("events.deployment.clearCache"));
        assert!(msg.contains("yesterday"));
    }

    #[test]
    fn test_siteline_error_from_variants() {
        let store = SitelineError::from(StoreError::Backend {
            reason: "down".to_string(),
        });
        assert!(matches!(store, SitelineError::Store(_)));

        let context = SitelineError::from(ContextError::NoAmbientContext);
        assert!(matches!(context, SitelineError::Context(_)));

        let config = SitelineError::from(ConfigError::Parse {
            source_name: "site-config.toml".to_string(),
            reason: "expected table".to_string(),
        });
        assert!(matches!(config, SitelineError::Config(_)));

        let event = SitelineError::from(EventError::Malformed {
            reason: "???".to_string(),
        });
        assert!(matches!(event, SitelineError::Event(_)));

        let validation = SitelineError::from(ValidationError::InvalidSiteName {
            value: "".to_string(),
            reason: "empty".to_string(),
        });
        assert!(matches!(validation, SitelineError::Validation(_)));
    }

    #[test]
    fn test_is_not_found() {
        let err = SitelineError::from(ContextError::NotFound {
            site: "acme".to_string(),
        });
        assert!(err.is_not_found());

        let err = SitelineError::from(ContextError::NoAmbientContext);
        assert!(!err.is_not_found());
    }
}
