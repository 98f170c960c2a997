//! Per-call caching policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Caching policy a caller passes along with a store lookup.
///
/// `None` at a call site means [`CachingOptions::default`], which caches with
/// no expiry. Entries always die when the owning scope's version moves on;
/// `expire_after` only shortens that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingOptions {
    pub do_caching: bool,
    pub expire_after: Option<Duration>,
}

impl Default for CachingOptions {
    fn default() -> Self {
        Self {
            do_caching: true,
            expire_after: None,
        }
    }
}

impl CachingOptions {
    /// Bypass the cache entirely.
    pub fn disabled() -> Self {
        Self {
            do_caching: false,
            expire_after: None,
        }
    }

    /// Cache, but treat entries older than `ttl` as misses.
    pub fn expiring(ttl: Duration) -> Self {
        Self {
            do_caching: true,
            expire_after: Some(ttl),
        }
    }

    /// Resolve an optional per-call setting to the effective policy.
    pub fn resolve(options: Option<&CachingOptions>) -> CachingOptions {
        options.copied().unwrap_or_default()
    }
}
