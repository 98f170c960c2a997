//! Siteline Core - Shared Types
//!
//! Data types shared by every Siteline crate: site identity, content items,
//! caching policy, deployment events, per-site configuration and the error
//! taxonomy. No I/O lives here.

pub mod caching;
pub mod config;
pub mod content;
pub mod error;
pub mod event;
pub mod identity;

pub use caching::CachingOptions;
pub use config::{PathTranslation, SiteConfig, SITE_CONFIG_PATH};
pub use content::{join_path, normalize_path, ContentItem, ItemKind, Listing};
pub use error::{
    ConfigError, ContextError, EventError, SitelineError, SitelineResult, StoreError,
    ValidationError,
};
pub use event::{
    DeploymentEvents, SiteEventKind, CLEAR_CACHE_KEY, DEFAULT_DEPLOYMENT_EVENTS_PATH,
    REBUILD_CONTEXT_KEY,
};
pub use identity::{new_scope_id, ScopeId, SiteName, Timestamp, MAX_SITE_NAME_LEN};
