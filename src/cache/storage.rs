//! String key/value media backing the persisted tiers.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;

/// A string-to-string storage medium.
///
/// Mirrors the shape of a browser storage area: every value is an opaque
/// string and the medium may refuse writes beyond its quota.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently held, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

fn used_bytes(items: &HashMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

fn check_quota(
    items: &HashMap<String, String>,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StorageError> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let replaced = items.get(key).map_or(0, |old| key.len() + old.len());
    let needed = used_bytes(items) - replaced + key.len() + value.len();
    if needed > quota {
        return Err(StorageError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

/// In-memory medium. Used for the session tier.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total bytes of keys plus values.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: RwLock::default(),
            quota: Some(quota),
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write();
        check_quota(&items, key, value, self.quota)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

/// File-backed medium. Used for the durable tier.
///
/// The whole map lives in one JSON file, loaded on open and rewritten through
/// a temporary file plus rename on every mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl FileStorage {
    /// Open the file at `path`, creating an empty store if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let items: HashMap<String, String> = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened durable storage at {} ({} items)", path.display(), items.len());

        Ok(Self {
            path,
            items: RwLock::new(items),
            quota: None,
        })
    }

    /// Limit the total bytes of keys plus values.
    #[must_use]
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&serde_json::to_vec(items)?)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write();
        check_quota(&items, key, value, self.quota)?;

        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&items) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write();
        if items.remove(key).is_some() {
            if let Err(e) = self.flush(&items) {
                warn!("Failed to persist removal of {}: {}", key, e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_quota() {
        let storage = MemoryStorage::with_quota(10);

        storage.set_item("ab", "cdef").unwrap();
        let err = storage.set_item("gh", "ijklmn").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 14, quota: 10 }));

        // Replacing an existing value only counts the difference.
        storage.set_item("ab", "cdefghij").unwrap();
        assert_eq!(storage.get_item("ab").unwrap().as_deref(), Some("cdefghij"));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set_item("cache:a", "1").unwrap();
            storage.set_item("cache:b", "2").unwrap();
            storage.remove_item("cache:a").unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("cache:a").unwrap(), None);
        assert_eq!(reopened.get_item("cache:b").unwrap().as_deref(), Some("2"));
        assert_eq!(reopened.keys().unwrap(), vec!["cache:b".to_string()]);
    }

    #[test]
    fn test_file_storage_quota_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let storage = FileStorage::open(&path).unwrap().with_quota(8);
        storage.set_item("k", "v").unwrap();
        assert!(storage.set_item("big", "0123456789").is_err());

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.keys().unwrap().len(), 1);
    }
}
