//! Reverse index from tag to the keys registered under it.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::RwLock;

/// Tag index.
///
/// Membership only records that a key was tagged. It does not prove the key
/// still has an entry in the store.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: RwLock<HashMap<String, HashSet<String>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` under every tag. Additive.
    pub fn register<S: AsRef<str>>(&self, key: &str, tags: &[S]) {
        if tags.is_empty() {
            return;
        }

        let mut index = self.tags.write();
        for tag in tags {
            index
                .entry(tag.as_ref().to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Union of the keys registered under `tags`.
    pub fn keys_for<S: AsRef<str>>(&self, tags: &[S]) -> HashSet<String> {
        let index = self.tags.read();
        tags.iter()
            .filter_map(|tag| index.get(tag.as_ref()))
            .flat_map(|keys| keys.iter().cloned())
            .collect()
    }

    /// Remove `key` from every tag. Tags left empty are dropped.
    pub fn forget(&self, key: &str) {
        let mut index = self.tags.write();
        index.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
    }

    /// Remove each key from every tag.
    pub fn forget_all<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let keys: HashSet<&str> = keys.into_iter().map(String::as_str).collect();
        if keys.is_empty() {
            return;
        }

        let mut index = self.tags.write();
        index.retain(|_, tagged| {
            tagged.retain(|k| !keys.contains(k.as_str()));
            !tagged.is_empty()
        });
    }

    /// Number of keys registered under each tag.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.tags
            .read()
            .iter()
            .map(|(tag, keys)| (tag.clone(), keys.len()))
            .collect()
    }

    pub fn count(&self, tag: &str) -> usize {
        self.tags.read().get(tag).map_or(0, HashSet::len)
    }

    pub fn clear(&self) {
        self.tags.write().clear();
    }
}
