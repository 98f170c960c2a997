//! Cache scopes and their versions.
//!
//! Every site context owns exactly one scope. Cache keys embed the scope's
//! version at the time they are built, so bumping the version makes every
//! existing entry for the scope unaddressable in one step. A retired scope
//! belongs to a destroyed context and never stores anything again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use siteline_core::{new_scope_id, ScopeId};

/// A cache scope: an identifier plus a monotonically increasing version.
#[derive(Debug)]
pub struct CacheScope {
    id: ScopeId,
    version: AtomicU64,
    retired: AtomicBool,
}

impl CacheScope {
    /// Create a fresh scope at version 0.
    pub fn new() -> Self {
        Self::with_id(new_scope_id())
    }

    /// Create a scope with an explicit id.
    pub fn with_id(id: ScopeId) -> Self {
        Self {
            id,
            version: AtomicU64::new(0),
            retired: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Current version. Readers see either the old or the new value across a
    /// concurrent bump, never a torn one.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Advance the version, returning the new value.
    pub fn bump(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Check if this scope's version is newer than `version`.
    pub fn is_newer_than(&self, version: u64) -> bool {
        self.version() > version
    }

    /// Mark the scope as retired. Returns false if it already was.
    pub fn retire(&self) -> bool {
        !self.retired.swap(true, Ordering::SeqCst)
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }
}

impl Default for CacheScope {
    fn default() -> Self {
        Self::new()
    }
}
