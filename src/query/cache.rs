//! Tag-indexed query cache.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{debug, info};

use super::options::{KeyPattern, QueryOptions, QueryResult};
use super::tags::TagIndex;
use crate::cache::{
    EntryStore, EntryStoreBuilder, GetOptions, RemovalCause, SetOptions, StoreConfig, StoreStats, Tier,
};

/// Configuration for a [`QueryCache`].
#[derive(Debug, Clone, Default)]
pub struct QueryCacheConfig {
    pub store: StoreConfig,

    /// Let concurrent misses on one key share a single fetch.
    /// Off by default: each caller runs its own fetch.
    pub single_flight: bool,
}

impl QueryCacheConfig {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            single_flight: false,
        }
    }

    #[must_use]
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }
}

/// Snapshot of a query cache.
#[derive(Debug, Clone, Serialize)]
pub struct QueryCacheStats {
    pub name: String,
    pub store: StoreStats,
    /// Keys currently registered under each tag.
    pub tags: BTreeMap<String, usize>,
}

type FlightTable = DashMap<String, Arc<AsyncMutex<()>>>;

struct Inner {
    name: Arc<str>,
    store: EntryStore,
    tags: TagIndex,
    single_flight: bool,
    in_flight: FlightTable,
}

/// A caller's membership in the in-flight table for one key.
///
/// Dropping it, whether the query finished or its future was cancelled,
/// removes the table entry once no other caller holds it.
struct Flight<'a> {
    table: &'a FlightTable,
    key: &'a str,
    lock: Option<Arc<AsyncMutex<()>>>,
}

impl<'a> Flight<'a> {
    fn join(table: &'a FlightTable, key: &'a str) -> Self {
        let lock = table.entry(key.to_string()).or_default().clone();
        Self {
            table,
            key,
            lock: Some(lock),
        }
    }

    async fn turn(&self) -> Option<AsyncMutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        // Release our handle first so whichever caller leaves last sees only
        // the table's own reference.
        let ptr = Arc::as_ptr(&lock);
        drop(lock);
        self.table
            .remove_if(self.key, |_, f| Arc::as_ptr(f) == ptr && Arc::strong_count(f) == 1);
    }
}

/// Memoizes asynchronous fetches in an [`EntryStore`] and indexes the keys by
/// tag for bulk invalidation.
///
/// Cloning is cheap and shares the same store and index.
///
/// The index subscribes to the store's removals: once expiry, eviction or a
/// direct `delete` leaves a key in no tier at all, it is pruned from every
/// tag. A copy surviving in another tier keeps its tags.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    /// Create a query cache over a fresh store.
    pub fn new(name: impl Into<Arc<str>>, config: QueryCacheConfig) -> Self {
        Self::with_store(name, EntryStore::builder(config.store), config.single_flight)
    }

    /// Create a query cache over a store assembled by the caller, e.g. with a
    /// file-backed durable tier or a manual clock.
    pub fn with_store(
        name: impl Into<Arc<str>>,
        store: EntryStoreBuilder,
        single_flight: bool,
    ) -> Self {
        let name = name.into();
        let inner = Arc::new_cyclic(|cache: &Weak<Inner>| {
            let cache = cache.clone();
            let store = store
                .removal_listener(Arc::new(move |key: &str, _: Tier, _: RemovalCause| {
                    if let Some(inner) = cache.upgrade() {
                        if !inner.store.holds(key) {
                            inner.tags.forget(key);
                        }
                    }
                }))
                .build();

            Inner {
                name,
                store,
                tags: TagIndex::new(),
                single_flight,
                in_flight: DashMap::new(),
            }
        });

        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The underlying entry store.
    pub fn store(&self) -> &EntryStore {
        &self.inner.store
    }

    /// Return the value cached under `key`, or run `fetch`, cache its result
    /// and register `key` under `opts.tags`.
    ///
    /// With `skip_cache` the store is neither read nor written. Errors from
    /// `fetch` are returned unchanged and nothing is cached.
    pub async fn query<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        opts: QueryOptions,
    ) -> Result<QueryResult<T>, E>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if opts.skip_cache {
            debug!("[{}] Bypassing cache for {}", self.inner.name, key);
            let data = fetch().await?;
            return Ok(self.result(key, data, false));
        }

        if let Some(hit) = self.lookup(key, &opts) {
            return Ok(hit);
        }

        if !self.inner.single_flight {
            return self.fetch_and_store(key, fetch, &opts).await;
        }

        let flight = Flight::join(&self.inner.in_flight, key);
        let _turn = flight.turn().await;
        // Another caller may have filled the entry while we waited.
        match self.lookup(key, &opts) {
            Some(hit) => Ok(hit),
            None => self.fetch_and_store(key, fetch, &opts).await,
        }
    }

    /// Write `value` under `key` directly and register it under `opts.tags`.
    pub fn set<T>(&self, key: &str, value: T, opts: QueryOptions)
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.inner.store.set(key, value, set_options(&opts));
        self.inner.tags.register(key, opts.tags.as_slice());
    }

    /// Remove a single key from the store and the tag index.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.store.delete(key);
        self.inner.tags.forget(key);
        removed
    }

    /// Remove every key the pattern matches, across all tiers.
    ///
    /// Returns the number of keys removed.
    pub fn invalidate_by_pattern(&self, pattern: impl Into<KeyPattern>) -> usize {
        let pattern = pattern.into();

        let matched: BTreeSet<String> = Tier::ALL
            .into_iter()
            .flat_map(|tier| self.inner.store.keys(tier))
            .filter(|key| pattern.matches(key))
            .collect();

        let removed = matched.iter().filter(|key| self.inner.store.delete(key)).count();
        self.inner.tags.forget_all(&matched);

        info!(
            "[{}] Invalidated {} keys matching {:?}",
            self.inner.name, removed, pattern
        );
        removed
    }

    /// Remove every key registered under any of `tags`.
    ///
    /// Each removed key leaves every tag it was registered under, not only
    /// the ones passed in. Returns the number of keys invalidated.
    pub fn invalidate_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let keys = self.inner.tags.keys_for(tags);

        for key in &keys {
            self.inner.store.delete(key);
        }
        self.inner.tags.forget_all(&keys);

        info!(
            "[{}] Invalidated {} keys for tags {:?}",
            self.inner.name,
            keys.len(),
            tags.iter().map(|t| t.as_ref()).collect::<Vec<&str>>()
        );
        keys.len()
    }

    /// Empty the store and discard the tag index.
    pub fn clear(&self) {
        self.inner.store.clear();
        self.inner.tags.clear();
    }

    pub fn stats(&self) -> QueryCacheStats {
        QueryCacheStats {
            name: self.inner.name.to_string(),
            store: self.inner.store.stats(),
            tags: self.inner.tags.counts(),
        }
    }

    fn lookup<T>(&self, key: &str, opts: &QueryOptions) -> Option<QueryResult<T>>
    where
        T: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        let get = GetOptions {
            version: opts.version.clone(),
            tier: opts.tier,
        };

        let data = self.inner.store.get::<T>(key, &get)?;
        debug!("[{}] Cache hit for {}", self.inner.name, key);
        Some(self.result(key, data, true))
    }

    async fn fetch_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        opts: &QueryOptions,
    ) -> Result<QueryResult<T>, E>
    where
        T: Clone + Serialize + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!("[{}] Cache miss for {}, fetching", self.inner.name, key);
        let data = fetch().await?;

        self.inner.store.set(key, data.clone(), set_options(opts));
        self.inner.tags.register(key, opts.tags.as_slice());

        Ok(self.result(key, data, false))
    }

    fn result<T>(&self, key: &str, data: T, cached: bool) -> QueryResult<T> {
        QueryResult {
            data,
            cached,
            timestamp: self.inner.store.now(),
            query: key.to_string(),
        }
    }
}

fn set_options(opts: &QueryOptions) -> SetOptions {
    SetOptions {
        ttl: opts.ttl,
        version: opts.version.clone(),
        tier: opts.tier,
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("name", &self.inner.name)
            .field("store", &self.inner.store)
            .field("tag_count", &self.inner.tags.counts().len())
            .finish()
    }
}
