//! Cache layer with per-site scopes.
//!
//! Every site context owns a [`CacheScope`]. Keys are built from the scope
//! and its current version, so a site's whole cache is invalidated by bumping
//! one counter: older entries become unaddressable immediately and are swept
//! lazily.
//!
//! # Tenant Isolation
//!
//! A [`ScopedCacheKey`] cannot be constructed without a [`CacheScope`], and
//! scopes are never shared between site contexts, so one site's lookups can
//! never land on another site's entries.

pub mod key;
pub mod memory_backend;
pub mod scope;
pub mod template;
pub mod traits;

pub use key::ScopedCacheKey;
pub use memory_backend::InMemoryCacheBackend;
pub use scope::CacheScope;
pub use template::CacheTemplate;
pub use traits::{CacheBackend, CacheStats, CachedValue};
