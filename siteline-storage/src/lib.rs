//! Siteline Storage - Store Adapters and Caching
//!
//! The store adapter contract, the in-memory and filesystem backends, the
//! decorator chain builder, and the cache template with its caching
//! decorator.

pub mod adapter;
pub mod cache;
pub mod cached;
pub mod decorator;
pub mod filesystem;
pub mod memory;

pub use adapter::{read_uncached, ContentStoreAdapter, StoreContext};
pub use cache::{
    CacheBackend, CacheScope, CacheStats, CacheTemplate, CachedValue, InMemoryCacheBackend,
    ScopedCacheKey,
};
pub use cached::{CachedStoreAdapter, CachingDecorator, FIND_FILE_OP, GET_CHILDREN_OP};
pub use decorator::{
    build_adapter_chain, AdapterDecorator, TranslatingDecorator, TranslatingStoreAdapter,
};
pub use filesystem::FileSystemStoreAdapter;
pub use memory::InMemoryStoreAdapter;
