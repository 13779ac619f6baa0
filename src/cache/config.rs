//! Entry store configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// How the transient tier picks a victim when it is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the earliest inserted key. Reads never change the order.
    #[default]
    Fifo,
    /// Evict the least recently read or inserted key.
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "lru" => Ok(Self::Lru),
            other => Err(format!("unknown eviction policy '{other}', expected fifo or lru")),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::Lru => f.write_str("lru"),
        }
    }
}

/// Configuration for an entry store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of entries held by the transient tier.
    /// Zero disables the ceiling.
    pub max_size: usize,

    /// Time-to-live applied when a write does not specify one.
    pub default_ttl: Duration,

    /// Prefix for keys written to persisted tiers.
    /// Keeps cache envelopes apart from unrelated data in the same medium.
    pub namespace: String,

    /// Victim selection for the transient tier.
    pub eviction: EvictionPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_size: 1_000,
            default_ttl: Duration::from_secs(300), // 5 minutes
            namespace: "cache:".to_string(),
            eviction: EvictionPolicy::Fifo,
        }
    }
}

impl StoreConfig {
    /// Create a store config with the given size ceiling.
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    /// Set the transient size ceiling (builder pattern).
    #[must_use]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the default time-to-live.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the persisted key prefix.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the eviction policy.
    #[must_use]
    pub fn eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Config for frequently read, quickly changing data.
    /// Higher capacity, shorter TTL.
    pub fn hot_data() -> Self {
        Self {
            max_size: 5_000,
            default_ttl: Duration::from_secs(60), // 1 minute
            ..Default::default()
        }
    }

    /// Config for rarely changing data.
    /// Lower capacity, longer TTL.
    pub fn cold_data() -> Self {
        Self {
            max_size: 500,
            default_ttl: Duration::from_secs(3600), // 1 hour
            ..Default::default()
        }
    }

    /// Config for data tied to a user session.
    pub fn session_data() -> Self {
        Self {
            max_size: 2_000,
            default_ttl: Duration::from_secs(1800), // 30 minutes
            eviction: EvictionPolicy::Lru,
            ..Default::default()
        }
    }
}
