//! Entry types shared by every tier.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Storage medium an entry is written to.
///
/// A key written to one tier is only found by reads against the same tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Process memory, bounded by `max_size`.
    #[default]
    Transient,
    /// Survives process restarts when the store has a file-backed medium.
    Durable,
    /// Lives as long as the owning store.
    Session,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Transient, Tier::Durable, Tier::Session];

    /// Whether values are serialized before they are stored.
    pub fn is_persisted(self) -> bool {
        !matches!(self, Tier::Transient)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Transient => f.write_str("transient"),
            Tier::Durable => f.write_str("durable"),
            Tier::Session => f.write_str("session"),
        }
    }
}

/// Why an entry left a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Read after its TTL elapsed.
    Expired,
    /// Read with a different version stamp.
    VersionMismatch,
    /// Stored envelope or value could not be decoded.
    Corrupt,
    /// Pushed out by the transient size ceiling.
    Evicted,
    /// Removed by `delete` or `clear`.
    Explicit,
}

/// Callback fired after an entry is removed.
pub type RemovalListener = Arc<dyn Fn(&str, Tier, RemovalCause) + Send + Sync>;

/// A transient entry. The value is type-erased; reads downcast it back.
#[derive(Clone)]
pub struct CacheEntry {
    pub value: Arc<dyn Any + Send + Sync>,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub version: Option<String>,
}

impl CacheEntry {
    /// Strictly past its TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.created_at, self.ttl, now)
    }

    /// A requested version that differs from the stored one.
    pub fn version_mismatch(&self, requested: Option<&str>) -> bool {
        version_mismatch(self.version.as_deref(), requested)
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("ttl", &self.ttl)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// JSON envelope written to persisted tiers.
///
/// `timestamp` and `ttl` are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub data: serde_json::Value,
    pub timestamp: i64,
    pub ttl: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Envelope {
    pub fn new(
        data: serde_json::Value,
        created_at: DateTime<Utc>,
        ttl: Duration,
        version: Option<String>,
    ) -> Self {
        Self {
            data,
            timestamp: created_at.timestamp_millis(),
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            version,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.created_at() {
            Some(created_at) => is_expired(created_at, Duration::from_millis(self.ttl), now),
            None => true,
        }
    }

    pub fn version_mismatch(&self, requested: Option<&str>) -> bool {
        version_mismatch(self.version.as_deref(), requested)
    }
}

/// Options for `EntryStore::set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub version: Option<String>,
    pub tier: Tier,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }
}

/// Options for `EntryStore::get` and `EntryStore::has`.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub version: Option<String>,
    pub tier: Tier,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }
}

fn is_expired(created_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        return false;
    };
    now.signed_duration_since(created_at) > ttl
}

// No requested version means any stored version matches.
fn version_mismatch(stored: Option<&str>, requested: Option<&str>) -> bool {
    match requested {
        Some(requested) => stored != Some(requested),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_strict() {
        let created = Utc::now();
        let ttl = Duration::from_millis(1000);

        assert!(!is_expired(created, ttl, created + chrono::Duration::milliseconds(1000)));
        assert!(is_expired(created, ttl, created + chrono::Duration::milliseconds(1001)));
    }

    #[test]
    fn test_version_match_rules() {
        assert!(!version_mismatch(Some("A"), None));
        assert!(!version_mismatch(Some("A"), Some("A")));
        assert!(version_mismatch(Some("A"), Some("B")));
        assert!(version_mismatch(None, Some("A")));
    }

    #[test]
    fn test_envelope_json_shape() {
        let created = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let envelope = Envelope::new(
            serde_json::json!({"name": "Ann"}),
            created,
            Duration::from_secs(2),
            None,
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": {"name": "Ann"}, "timestamp": 1_700_000_000_000i64, "ttl": 2000})
        );

        let versioned = Envelope { version: Some("v2".into()), ..envelope };
        let json = serde_json::to_value(&versioned).unwrap();
        assert_eq!(json["version"], "v2");
    }
}
