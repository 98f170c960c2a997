//! Scope-bound cache keys.
//!
//! A [`ScopedCacheKey`] can only be built from a [`CacheScope`], so there is
//! no way to address a cache entry without naming the site scope it belongs
//! to. The scope's version is captured at construction: once the scope is
//! bumped, keys built afterwards no longer match entries stored before.

use std::fmt;

use siteline_core::ScopeId;

use super::scope::CacheScope;

/// Separator used in the printable form of a key.
const SEPARATOR: char = '|';

/// A cache key bound to one scope at one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedCacheKey {
    /// Private inner data - cannot be constructed externally
    inner: ScopedKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScopedKeyInner {
    scope_id: ScopeId,
    version: u64,
    operation: &'static str,
    parts: Vec<String>,
}

impl ScopedCacheKey {
    /// Build a key for `operation` with `parts` as its arguments, under the
    /// scope's current version.
    pub fn new(scope: &CacheScope, operation: &'static str, parts: &[&str]) -> Self {
        Self {
            inner: ScopedKeyInner {
                scope_id: scope.id(),
                version: scope.version(),
                operation,
                parts: parts.iter().map(|p| p.to_string()).collect(),
            },
        }
    }

    pub fn scope_id(&self) -> ScopeId {
        self.inner.scope_id
    }

    pub fn version(&self) -> u64 {
        self.inner.version
    }

    pub fn operation(&self) -> &'static str {
        self.inner.operation
    }

    pub fn parts(&self) -> &[String] {
        &self.inner.parts
    }

    /// Whether this key was built under an older version of its scope.
    pub fn is_stale_for(&self, scope_id: ScopeId, current_version: u64) -> bool {
        self.inner.scope_id == scope_id && self.inner.version < current_version
    }
}

impl fmt::Display for ScopedCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}v{}{sep}{}",
            self.inner.scope_id,
            self.inner.version,
            self.inner.operation,
            sep = SEPARATOR
        )?;
        for part in &self.inner.parts {
            write!(f, "{}{}", SEPARATOR, part)?;
        }
        Ok(())
    }
}
