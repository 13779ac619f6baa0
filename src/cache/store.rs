//! Entry store - TTL and version aware storage across tiers.

use std::any::type_name;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::config::{EvictionPolicy, StoreConfig};
use super::entry::{CacheEntry, Envelope, GetOptions, RemovalCause, RemovalListener, SetOptions, Tier};
use super::storage::{MemoryStorage, Storage};
use super::transient::TransientTier;

/// Snapshot of an entry store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Entries held by the transient tier.
    pub size: usize,
    /// Transient keys, oldest first.
    pub keys: Vec<String>,
    pub max_size: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub default_ttl: Duration,
    /// Namespaced envelopes in the durable tier.
    pub durable_entries: usize,
    /// Namespaced envelopes in the session tier.
    pub session_entries: usize,
    pub eviction: EvictionPolicy,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

type Removal = (String, Tier, RemovalCause);

/// Builder for an [`EntryStore`].
pub struct EntryStoreBuilder {
    config: StoreConfig,
    durable: Option<Arc<dyn Storage>>,
    session: Option<Arc<dyn Storage>>,
    clock: Arc<dyn Clock>,
    listeners: Vec<RemovalListener>,
}

impl EntryStoreBuilder {
    /// Medium for the durable tier. Defaults to process memory.
    #[must_use]
    pub fn durable(mut self, storage: Arc<dyn Storage>) -> Self {
        self.durable = Some(storage);
        self
    }

    /// Medium for the session tier. Defaults to process memory.
    #[must_use]
    pub fn session(mut self, storage: Arc<dyn Storage>) -> Self {
        self.session = Some(storage);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add a callback fired after every removal, outside the store's locks.
    #[must_use]
    pub fn removal_listener(mut self, listener: RemovalListener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> EntryStore {
        let durable = self.durable.unwrap_or_else(|| {
            debug!("No durable medium configured, durable tier is process-local");
            Arc::new(MemoryStorage::new())
        });

        EntryStore {
            transient: Mutex::new(TransientTier::new(self.config.max_size, self.config.eviction)),
            durable,
            session: self.session.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            clock: self.clock,
            listeners: self.listeners,
            config: self.config,
        }
    }
}

/// Key-value store with per-entry TTL, optional version stamps and
/// selectable tiers.
///
/// Expiry and version checks happen lazily on read: a read that finds an
/// expired or mismatched entry removes it and reports a miss. Storage faults
/// are logged and never returned to the caller.
pub struct EntryStore {
    transient: Mutex<TransientTier>,
    durable: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    listeners: Vec<RemovalListener>,
    config: StoreConfig,
}

impl EntryStore {
    /// Create a store with in-memory persisted tiers and the system clock.
    pub fn new(config: StoreConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: StoreConfig) -> EntryStoreBuilder {
        EntryStoreBuilder {
            config,
            durable: None,
            session: None,
            clock: Arc::new(SystemClock),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current instant according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Write `value` under `key` in the requested tier.
    ///
    /// Persisted tiers store a JSON envelope under the namespaced key. If the
    /// value cannot be serialized or the medium refuses it, the write is
    /// dropped with a warning.
    pub fn set<T>(&self, key: &str, value: T, opts: SetOptions)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let ttl = opts.ttl.unwrap_or(self.config.default_ttl);
        let created_at = self.clock.now();

        if opts.tier == Tier::Transient {
            let entry = CacheEntry {
                value: Arc::new(value),
                created_at,
                ttl,
                version: opts.version,
            };

            let evicted = self.transient.lock().insert(key, entry);
            if let Some(evicted) = evicted {
                debug!("Evicted {} to make room for {}", evicted, key);
                self.notify(vec![(evicted, Tier::Transient, RemovalCause::Evicted)]);
            }
            return;
        }

        let data = match serde_json::to_value(&value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize cache entry {} for {} tier: {}", key, opts.tier, e);
                return;
            }
        };

        let envelope = Envelope::new(data, created_at, ttl, opts.version);
        let encoded = match serde_json::to_string(&envelope) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode cache envelope {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.medium(opts.tier).set_item(&self.namespaced(key), &encoded) {
            warn!("Failed to persist cache entry {} to {} tier: {}", key, opts.tier, e);
        }
    }

    /// Read the value stored under `key`, or `None` when it is missing,
    /// expired, version-mismatched or undecodable.
    pub fn get<T>(&self, key: &str, opts: &GetOptions) -> Option<T>
    where
        T: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        match opts.tier {
            Tier::Transient => self.get_transient(key, opts.version.as_deref()),
            tier => self
                .read_envelope(key, tier, opts.version.as_deref())
                .and_then(|envelope| self.decode(key, tier, envelope)),
        }
    }

    /// Whether `get` would currently find an entry, ignoring its type.
    pub fn has(&self, key: &str, opts: &GetOptions) -> bool {
        match opts.tier {
            Tier::Transient => self
                .probe_transient(key, opts.version.as_deref(), |_| Some(()))
                .is_some(),
            tier => self.read_envelope(key, tier, opts.version.as_deref()).is_some(),
        }
    }

    /// Remove `key` from every tier. Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let mut removed = Vec::new();

        if self.transient.lock().remove(key).is_some() {
            removed.push((key.to_string(), Tier::Transient, RemovalCause::Explicit));
        }

        for tier in [Tier::Durable, Tier::Session] {
            if self.remove_persisted(key, tier) {
                removed.push((key.to_string(), tier, RemovalCause::Explicit));
            }
        }

        let any = !removed.is_empty();
        self.notify(removed);
        any
    }

    /// Remove every entry from every tier.
    ///
    /// Persisted media only lose keys carrying this store's namespace.
    pub fn clear(&self) {
        let mut removed: Vec<Removal> = self
            .transient
            .lock()
            .clear()
            .into_iter()
            .map(|key| (key, Tier::Transient, RemovalCause::Explicit))
            .collect();

        for tier in [Tier::Durable, Tier::Session] {
            for key in self.persisted_keys(tier) {
                if self.remove_persisted(&key, tier) {
                    removed.push((key, tier, RemovalCause::Explicit));
                }
            }
        }

        info!("Cleared cache store ({} entries)", removed.len());
        self.notify(removed);
    }

    /// Whether any tier still physically holds `key`.
    ///
    /// Unlike `has`, this neither checks expiry nor purges, so it is safe to
    /// call from a removal listener.
    pub fn holds(&self, key: &str) -> bool {
        if self.transient.lock().contains(key) {
            return true;
        }

        let namespaced = self.namespaced(key);
        [Tier::Durable, Tier::Session]
            .into_iter()
            .any(|tier| matches!(self.medium(tier).get_item(&namespaced), Ok(Some(_))))
    }

    /// Keys currently held by `tier`, without the namespace prefix.
    ///
    /// Transient keys come back oldest first. Entries are not checked for
    /// expiry.
    pub fn keys(&self, tier: Tier) -> Vec<String> {
        match tier {
            Tier::Transient => self.transient.lock().keys(),
            tier => self.persisted_keys(tier),
        }
    }

    pub fn stats(&self) -> StoreStats {
        let (size, keys, max_size, eviction) = {
            let transient = self.transient.lock();
            (transient.len(), transient.keys(), transient.max_size(), transient.policy())
        };

        StoreStats {
            size,
            keys,
            max_size,
            default_ttl: self.config.default_ttl,
            durable_entries: self.persisted_keys(Tier::Durable).len(),
            session_entries: self.persisted_keys(Tier::Session).len(),
            eviction,
        }
    }

    fn get_transient<T>(&self, key: &str, version: Option<&str>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.probe_transient(key, version, |entry| entry.value.downcast_ref::<T>().cloned())
            .or_else(|| {
                debug!("Cache miss for {} (transient, {})", key, type_name::<T>());
                None
            })
    }

    /// Look up a live transient entry and run `extract` on it.
    ///
    /// Expired or mismatched entries, and entries `extract` rejects, are
    /// purged.
    fn probe_transient<R>(
        &self,
        key: &str,
        version: Option<&str>,
        extract: impl FnOnce(&CacheEntry) -> Option<R>,
    ) -> Option<R> {
        let now = self.clock.now();

        let (result, cause) = {
            let mut transient = self.transient.lock();
            let entry = transient.get(key)?;

            let cause = if entry.is_expired(now) {
                Some(RemovalCause::Expired)
            } else if entry.version_mismatch(version) {
                Some(RemovalCause::VersionMismatch)
            } else {
                None
            };

            match cause {
                Some(cause) => {
                    transient.remove(key);
                    (None, Some(cause))
                }
                None => match extract(entry) {
                    Some(value) => {
                        transient.touch(key);
                        (Some(value), None)
                    }
                    None => {
                        warn!("Cache entry {} holds an unexpected type, discarding it", key);
                        transient.remove(key);
                        (None, Some(RemovalCause::Corrupt))
                    }
                },
            }
        };

        if let Some(cause) = cause {
            debug!("Purged {} from transient tier ({:?})", key, cause);
            self.notify(vec![(key.to_string(), Tier::Transient, cause)]);
        }
        result
    }

    /// Load a live envelope from a persisted tier, purging it when it is
    /// corrupt, expired or mismatched.
    fn read_envelope(&self, key: &str, tier: Tier, version: Option<&str>) -> Option<Envelope> {
        let raw = match self.medium(tier).get_item(&self.namespaced(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for {} ({})", key, tier);
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache entry {} from {} tier: {}", key, tier, e);
                return None;
            }
        };

        let cause = match serde_json::from_str::<Envelope>(&raw) {
            Err(e) => {
                warn!("Corrupt cache envelope {} in {} tier: {}", key, tier, e);
                RemovalCause::Corrupt
            }
            Ok(envelope) if envelope.is_expired(self.clock.now()) => RemovalCause::Expired,
            Ok(envelope) if envelope.version_mismatch(version) => RemovalCause::VersionMismatch,
            Ok(envelope) => return Some(envelope),
        };

        self.purge(key, tier, cause);
        None
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, tier: Tier, envelope: Envelope) -> Option<T> {
        match serde_json::from_value(envelope.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to decode cache entry {} as {}: {}", key, type_name::<T>(), e);
                self.purge(key, tier, RemovalCause::Corrupt);
                None
            }
        }
    }

    fn purge(&self, key: &str, tier: Tier, cause: RemovalCause) {
        if self.remove_persisted(key, tier) {
            debug!("Purged {} from {} tier ({:?})", key, tier, cause);
            self.notify(vec![(key.to_string(), tier, cause)]);
        }
    }

    fn remove_persisted(&self, key: &str, tier: Tier) -> bool {
        let medium = self.medium(tier);
        let namespaced = self.namespaced(key);

        match medium.get_item(&namespaced) {
            Ok(None) => return false,
            Ok(Some(_)) => {}
            Err(e) => warn!("Failed to read cache entry {} from {} tier: {}", key, tier, e),
        }

        match medium.remove_item(&namespaced) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove cache entry {} from {} tier: {}", key, tier, e);
                false
            }
        }
    }

    fn persisted_keys(&self, tier: Tier) -> Vec<String> {
        match self.medium(tier).keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(self.config.namespace.as_str()).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!("Failed to list {} tier keys: {}", tier, e);
                Vec::new()
            }
        }
    }

    fn medium(&self, tier: Tier) -> &dyn Storage {
        match tier {
            Tier::Session => self.session.as_ref(),
            _ => self.durable.as_ref(),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.config.namespace, key)
    }

    fn notify(&self, removals: Vec<Removal>) {
        if self.listeners.is_empty() {
            return;
        }
        for (key, tier, cause) in removals {
            for listener in &self.listeners {
                listener(&key, tier, cause);
            }
        }
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transient = self.transient.lock();
        f.debug_struct("EntryStore")
            .field("transient_entries", &transient.len())
            .field("max_size", &transient.max_size())
            .field("namespace", &self.config.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::error::StorageError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
    }

    fn ann() -> User {
        User { name: "Ann".into() }
    }

    fn store_with_clock(config: StoreConfig) -> (EntryStore, ManualClock) {
        let clock = ManualClock::new();
        let store = EntryStore::builder(config).clock(Arc::new(clock.clone())).build();
        (store, clock)
    }

    #[test]
    fn test_round_trip_and_expiry() {
        let (store, clock) = store_with_clock(StoreConfig::default());

        store.set("user:42", ann(), SetOptions::new().ttl(Duration::from_millis(1000)));
        assert_eq!(store.get::<User>("user:42", &GetOptions::new()), Some(ann()));

        clock.advance(Duration::from_millis(1100));
        assert_eq!(store.get::<User>("user:42", &GetOptions::new()), None);
        assert!(store.stats().keys.is_empty());
    }

    #[test]
    fn test_entry_alive_at_exact_ttl() {
        let (store, clock) = store_with_clock(StoreConfig::default());

        store.set("k", 1u32, SetOptions::new().ttl(Duration::from_millis(1000)));
        clock.advance(Duration::from_millis(1000));

        assert!(store.has("k", &GetOptions::new()));
    }

    #[test]
    fn test_default_ttl_applies() {
        let (store, clock) = store_with_clock(StoreConfig::default().ttl(Duration::from_secs(10)));

        store.set("k", 1u32, SetOptions::new());
        clock.advance(Duration::from_secs(11));

        assert_eq!(store.get::<u32>("k", &GetOptions::new()), None);
    }

    #[test]
    fn test_version_mismatch_purges() {
        let store = EntryStore::new(StoreConfig::default());

        store.set("k", ann(), SetOptions::new().version("A"));
        assert_eq!(store.get::<User>("k", &GetOptions::new().version("A")), Some(ann()));
        assert_eq!(store.get::<User>("k", &GetOptions::new().version("B")), None);

        // The failed read removed the entry, so even the old version misses.
        assert_eq!(store.get::<User>("k", &GetOptions::new().version("A")), None);
    }

    #[test]
    fn test_unversioned_read_matches_versioned_entry() {
        let store = EntryStore::new(StoreConfig::default());

        store.set("k", 5i64, SetOptions::new().version("A"));

        assert_eq!(store.get::<i64>("k", &GetOptions::new()), Some(5));
    }

    #[test]
    fn test_fifo_eviction() {
        let store = EntryStore::new(StoreConfig::with_capacity(2));

        store.set("a", 1, SetOptions::new());
        store.set("b", 2, SetOptions::new());
        store.set("c", 3, SetOptions::new());

        assert_eq!(store.get::<i32>("a", &GetOptions::new()), None);
        assert_eq!(store.get::<i32>("b", &GetOptions::new()), Some(2));
        assert_eq!(store.get::<i32>("c", &GetOptions::new()), Some(3));
    }

    #[test]
    fn test_reads_do_not_protect_from_fifo_eviction() {
        let store = EntryStore::new(StoreConfig::with_capacity(2));

        store.set("a", 1, SetOptions::new());
        store.set("b", 2, SetOptions::new());
        assert_eq!(store.get::<i32>("a", &GetOptions::new()), Some(1));
        store.set("c", 3, SetOptions::new());

        assert!(!store.has("a", &GetOptions::new()));
    }

    #[test]
    fn test_lru_eviction_respects_reads() {
        let store = EntryStore::new(StoreConfig::with_capacity(2).eviction(EvictionPolicy::Lru));

        store.set("a", 1, SetOptions::new());
        store.set("b", 2, SetOptions::new());
        assert_eq!(store.get::<i32>("a", &GetOptions::new()), Some(1));
        store.set("c", 3, SetOptions::new());

        assert!(store.has("a", &GetOptions::new()));
        assert!(!store.has("b", &GetOptions::new()));
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let store = EntryStore::new(StoreConfig::default());

        store.set("k", 7u8, SetOptions::new());

        assert_eq!(store.get::<String>("k", &GetOptions::new()), None);
        assert!(!store.has("k", &GetOptions::new()));
    }

    #[test]
    fn test_tiers_are_not_merged() {
        let store = EntryStore::new(StoreConfig::default());

        store.set("k", ann(), SetOptions::new().tier(Tier::Session));

        assert_eq!(store.get::<User>("k", &GetOptions::new()), None);
        assert_eq!(store.get::<User>("k", &GetOptions::new().tier(Tier::Durable)), None);
        assert_eq!(
            store.get::<User>("k", &GetOptions::new().tier(Tier::Session)),
            Some(ann())
        );
    }

    #[test]
    fn test_persisted_envelope_is_namespaced() {
        let session = Arc::new(MemoryStorage::new());
        let store = EntryStore::builder(StoreConfig::default().namespace("app:"))
            .session(session.clone())
            .build();

        store.set("user:42", ann(), SetOptions::new().tier(Tier::Session).version("v1"));

        let raw = session.get_item("app:user:42").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"]["name"], "Ann");
        assert_eq!(json["version"], "v1");
        assert_eq!(json["ttl"], 300_000);
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_persisted_expiry_and_version() {
        let (store, clock) = store_with_clock(StoreConfig::default());
        let durable = GetOptions::new().tier(Tier::Durable);

        store.set(
            "k",
            ann(),
            SetOptions::new().tier(Tier::Durable).ttl(Duration::from_secs(1)).version("A"),
        );
        assert_eq!(store.get::<User>("k", &durable.clone().version("B")), None);
        assert_eq!(store.stats().durable_entries, 0);

        store.set("k", ann(), SetOptions::new().tier(Tier::Durable).ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));
        assert_eq!(store.get::<User>("k", &durable), None);
        assert_eq!(store.stats().durable_entries, 0);
    }

    #[test]
    fn test_corrupt_envelope_is_purged() {
        let session = Arc::new(MemoryStorage::new());
        let store = EntryStore::builder(StoreConfig::default())
            .session(session.clone())
            .build();

        session.set_item("cache:bad", "{not json").unwrap();
        assert_eq!(store.get::<User>("bad", &GetOptions::new().tier(Tier::Session)), None);
        assert_eq!(session.get_item("cache:bad").unwrap(), None);

        store.set("shape", 3u32, SetOptions::new().tier(Tier::Session));
        assert_eq!(store.get::<User>("shape", &GetOptions::new().tier(Tier::Session)), None);
        assert_eq!(session.get_item("cache:shape").unwrap(), None);
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let store = EntryStore::builder(StoreConfig::default())
            .session(Arc::new(MemoryStorage::with_quota(16)))
            .build();

        store.set("k", "a long value that will not fit", SetOptions::new().tier(Tier::Session));

        assert!(!store.has("k", &GetOptions::new().tier(Tier::Session)));
    }

    #[test]
    fn test_delete_and_clear_span_tiers() {
        let session = Arc::new(MemoryStorage::new());
        session.set_item("unrelated", "keep me").unwrap();
        let store = EntryStore::builder(StoreConfig::default())
            .session(session.clone())
            .build();

        for tier in Tier::ALL {
            store.set("k", 1u32, SetOptions::new().tier(tier));
        }
        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        for tier in Tier::ALL {
            assert!(!store.has("k", &GetOptions::new().tier(tier)));
        }

        store.set("a", 1u32, SetOptions::new());
        store.set("b", 2u32, SetOptions::new().tier(Tier::Durable));
        store.set("c", 3u32, SetOptions::new().tier(Tier::Session));
        store.clear();

        let stats = store.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.durable_entries, 0);
        assert_eq!(stats.session_entries, 0);
        assert_eq!(session.get_item("unrelated").unwrap().as_deref(), Some("keep me"));
    }

    #[test]
    fn test_removal_listener_reports_causes() {
        let seen: Arc<Mutex<Vec<(String, Tier, RemovalCause)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let clock = ManualClock::new();
        let store = EntryStore::builder(StoreConfig::with_capacity(1))
            .clock(Arc::new(clock.clone()))
            .removal_listener(Arc::new(move |key: &str, tier: Tier, cause: RemovalCause| {
                sink.lock().push((key.to_string(), tier, cause));
            }))
            .build();

        store.set("a", 1, SetOptions::new().ttl(Duration::from_secs(1)));
        store.set("b", 2, SetOptions::new().ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));
        assert_eq!(store.get::<i32>("b", &GetOptions::new()), None);
        store.set("c", 3, SetOptions::new().tier(Tier::Durable));
        store.delete("c");

        assert_eq!(
            *seen.lock(),
            vec![
                ("a".to_string(), Tier::Transient, RemovalCause::Evicted),
                ("b".to_string(), Tier::Transient, RemovalCause::Expired),
                ("c".to_string(), Tier::Durable, RemovalCause::Explicit),
            ]
        );
    }

    /// Session medium that accepts writes but refuses removals.
    #[derive(Default)]
    struct StuckStorage {
        inner: MemoryStorage,
    }

    impl Storage for StuckStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("medium is read-only")))
        }

        fn keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_failed_purge_sends_no_removal() {
        let seen: Arc<Mutex<Vec<(String, Tier, RemovalCause)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let clock = ManualClock::new();
        let store = EntryStore::builder(StoreConfig::default())
            .clock(Arc::new(clock.clone()))
            .session(Arc::new(StuckStorage::default()))
            .removal_listener(Arc::new(move |key: &str, tier: Tier, cause: RemovalCause| {
                sink.lock().push((key.to_string(), tier, cause));
            }))
            .build();
        let session = GetOptions::new().tier(Tier::Session);

        store.set("k", 1u32, SetOptions::new().tier(Tier::Session).ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));

        assert_eq!(store.get::<u32>("k", &session), None);
        assert!(!store.delete("k"));
        assert!(store.holds("k"));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_holds_ignores_expiry_and_spans_tiers() {
        let (store, clock) = store_with_clock(StoreConfig::default());

        store.set("k", 1u32, SetOptions::new().ttl(Duration::from_secs(1)));
        store.set("k", 2u32, SetOptions::new().tier(Tier::Session));
        clock.advance(Duration::from_secs(2));

        assert!(store.holds("k"));
        assert_eq!(store.get::<u32>("k", &GetOptions::new()), None);
        assert!(store.holds("k"));

        store.delete("k");
        assert!(!store.holds("k"));
    }

    #[test]
    fn test_stats_are_read_only() {
        let store = EntryStore::new(StoreConfig::with_capacity(10).ttl(Duration::from_secs(60)));

        store.set("x", 1, SetOptions::new());
        store.set("y", 2, SetOptions::new());
        let stats = store.stats();

        assert_eq!(stats.size, 2);
        assert_eq!(stats.keys, vec!["x", "y"]);
        assert_eq!(stats.max_size, 10);
        assert_eq!(stats.default_ttl, Duration::from_secs(60));
        assert_eq!(store.stats().size, 2);
    }
}
