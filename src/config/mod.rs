//! Configuration module.
//!
//! Loads cache settings from environment variables (and a `.env` file).

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::{EntryStore, EvictionPolicy, FileStorage, StoreConfig};
use crate::error::ConfigError;
use crate::query::{QueryCache, QueryCacheConfig};

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub store: StoreConfig,

    /// Share one fetch between concurrent misses on the same key.
    pub single_flight: bool,

    /// File backing the durable tier.
    /// Optional - the durable tier stays in memory if not set.
    pub durable_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CACHE_MAX_SIZE` | 1000 |
    /// | `CACHE_DEFAULT_TTL_SECS` | 300 |
    /// | `CACHE_NAMESPACE` | `cache:` |
    /// | `CACHE_EVICTION` | `fifo` |
    /// | `CACHE_SINGLE_FLIGHT` | `false` |
    /// | `CACHE_DURABLE_PATH` | unset |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut store = StoreConfig::default();

        if let Some(raw) = get("CACHE_MAX_SIZE") {
            store.max_size = raw
                .parse()
                .map_err(|e| ConfigError::invalid("CACHE_MAX_SIZE", &raw, e))?;
        }

        if let Some(raw) = get("CACHE_DEFAULT_TTL_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|e| ConfigError::invalid("CACHE_DEFAULT_TTL_SECS", &raw, e))?;
            store.default_ttl = Duration::from_secs(secs);
        }

        if let Some(namespace) = get("CACHE_NAMESPACE") {
            store.namespace = namespace;
        }

        if let Some(raw) = get("CACHE_EVICTION") {
            store.eviction = raw
                .parse::<EvictionPolicy>()
                .map_err(|e| ConfigError::invalid("CACHE_EVICTION", &raw, e))?;
        }

        let single_flight = match get("CACHE_SINGLE_FLIGHT") {
            None => false,
            Some(raw) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::invalid("CACHE_SINGLE_FLIGHT", &raw, "expected a boolean")),
            },
        };

        Ok(Self {
            store,
            single_flight,
            durable_path: get("CACHE_DURABLE_PATH").map(PathBuf::from),
        })
    }

    pub fn query_cache_config(&self) -> QueryCacheConfig {
        QueryCacheConfig::new(self.store.clone()).single_flight(self.single_flight)
    }

    /// Build a query cache from this configuration.
    ///
    /// A durable file that cannot be opened is logged and replaced by an
    /// in-memory durable tier.
    pub fn build_cache(&self, name: &str) -> QueryCache {
        let mut store = EntryStore::builder(self.store.clone());

        if let Some(path) = &self.durable_path {
            match FileStorage::open(path) {
                Ok(storage) => store = store.durable(Arc::new(storage)),
                Err(e) => warn!("Failed to open durable storage {}: {}", path.display(), e),
            }
        }

        QueryCache::with_store(name, store, self.single_flight)
    }
}
