//! Cache registry - named query caches built once and passed around.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::query::{QueryCache, QueryCacheConfig, QueryCacheStats};

/// Registry of named [`QueryCache`] instances.
///
/// Construct one at startup and hand clones to whatever needs caching; each
/// test can build its own instead of sharing hidden global state.
///
/// ## Example
///
/// ```rust
/// use tagcache::query::QueryCacheConfig;
/// use tagcache::CacheRegistry;
///
/// let registry = CacheRegistry::new();
///
/// // Create a cache for API responses
/// let api = registry.create("api", QueryCacheConfig::default());
///
/// // Later, retrieve the same cache
/// let same = registry.get("api").unwrap();
/// assert_eq!(same.name(), api.name());
/// ```
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, QueryCache>>>,
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        info!("Cache registry initialized");
        Self::default()
    }

    /// Create and register a cache.
    ///
    /// If a cache with this name already exists it is returned unchanged and
    /// `config` is ignored.
    pub fn create(&self, name: &str, config: QueryCacheConfig) -> QueryCache {
        let mut caches = self.caches.write();

        if let Some(existing) = caches.get(name) {
            return existing.clone();
        }

        debug!("Creating cache: {}", name);
        let cache = QueryCache::new(name, config);
        caches.insert(name.to_string(), cache.clone());
        cache
    }

    /// Register a cache built elsewhere, replacing any cache of the same name.
    ///
    /// Returns a handle to the registered cache.
    pub fn insert(&self, cache: QueryCache) -> QueryCache {
        debug!("Registering cache: {}", cache.name());
        self.caches.write().insert(cache.name().to_string(), cache.clone());
        cache
    }

    /// Get an existing cache by name.
    pub fn get(&self, name: &str) -> Option<QueryCache> {
        self.caches.read().get(name).cloned()
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    pub fn get_or_create(&self, name: &str, config: QueryCacheConfig) -> QueryCache {
        if let Some(cache) = self.get(name) {
            return cache;
        }
        self.create(name, config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Remove a cache from the registry.
    ///
    /// Returns `true` if the cache was removed. Clones held elsewhere keep
    /// working.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.caches.write().remove(name).is_some();
        if removed {
            debug!("Removed cache: {}", name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.read().is_empty()
    }

    /// Names of all registered caches, sorted.
    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Clear every registered cache.
    pub fn clear_all(&self) {
        let caches: Vec<QueryCache> = self.caches.read().values().cloned().collect();
        for cache in &caches {
            cache.clear();
        }
        info!("Cleared {} caches", caches.len());
    }

    /// Stats of every registered cache, sorted by name.
    pub fn stats(&self) -> Vec<QueryCacheStats> {
        let mut stats: Vec<QueryCacheStats> =
            self.caches.read().values().map(QueryCache::stats).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("cache_count", &self.len())
            .field("cache_names", &self.cache_names())
            .finish()
    }
}
