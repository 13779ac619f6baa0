//! Bounded in-process map that remembers insertion order.

use std::collections::{BTreeMap, HashMap};

use super::config::EvictionPolicy;
use super::entry::CacheEntry;

/// The transient tier.
///
/// Every entry carries a generation stamp and `order` maps each live stamp
/// back to its key, so the smallest stamp is always the oldest key. Under
/// `Fifo` only inserts of new keys take a fresh stamp; under `Lru` reads and
/// overwrites restamp the key as well.
#[derive(Debug)]
pub(crate) struct TransientTier {
    entries: HashMap<String, (u64, CacheEntry)>,
    order: BTreeMap<u64, String>,
    next_stamp: u64,
    max_size: usize,
    policy: EvictionPolicy,
}

impl TransientTier {
    pub fn new(max_size: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_stamp: 0,
            max_size,
            policy,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).map(|(_, entry)| entry)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Record a successful read.
    pub fn touch(&mut self, key: &str) {
        if self.policy == EvictionPolicy::Lru {
            self.restamp(key);
        }
    }

    /// Insert or overwrite an entry.
    ///
    /// Returns the key evicted to make room, if any. Overwrites never evict.
    pub fn insert(&mut self, key: &str, entry: CacheEntry) -> Option<String> {
        if let Some((_, slot)) = self.entries.get_mut(key) {
            *slot = entry;
            if self.policy == EvictionPolicy::Lru {
                self.restamp(key);
            }
            return None;
        }

        let evicted = if self.max_size > 0 && self.entries.len() >= self.max_size {
            self.pop_oldest()
        } else {
            None
        };

        let stamp = self.stamp();
        self.entries.insert(key.to_string(), (stamp, entry));
        self.order.insert(stamp, key.to_string());
        evicted
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let (stamp, entry) = self.entries.remove(key)?;
        self.order.remove(&stamp);
        Some(entry)
    }

    /// Drop everything, returning the removed keys oldest first.
    pub fn clear(&mut self) -> Vec<String> {
        self.entries.clear();
        std::mem::take(&mut self.order).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Keys oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.order.values().cloned().collect()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    fn stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn restamp(&mut self, key: &str) {
        let stamp = self.stamp();
        if let Some((old, _)) = self.entries.get_mut(key) {
            if let Some(k) = self.order.remove(&*old) {
                self.order.insert(stamp, k);
            }
            *old = stamp;
        }
    }
}
