//! Per-call options and the result envelope.

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::cache::Tier;

/// Options for [`QueryCache::query`](super::QueryCache::query).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Overrides the store's default TTL.
    pub ttl: Option<Duration>,
    /// Tags the key is registered under after a fresh fetch.
    pub tags: Vec<String>,
    /// Version stamp written with, and required of, the cached value.
    pub version: Option<String>,
    /// Always fetch, never read or write the store.
    pub skip_cache: bool,
    /// Tier holding the memoized value.
    pub tier: Tier,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }
}

/// Result of a memoized fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<T> {
    pub data: T,
    /// `true` when `data` came from the store.
    pub cached: bool,
    pub timestamp: DateTime<Utc>,
    /// The key the query ran under.
    pub query: String,
}

/// Key selector for [`QueryCache::invalidate_by_pattern`](super::QueryCache::invalidate_by_pattern).
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Keys containing this text.
    Substring(String),
    /// Keys the expression matches anywhere.
    Regex(Regex),
}

impl KeyPattern {
    /// Compile a regular expression pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Substring(needle) => key.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(key),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(s: &str) -> Self {
        Self::Substring(s.to_string())
    }
}

impl From<String> for KeyPattern {
    fn from(s: String) -> Self {
        Self::Substring(s)
    }
}

impl From<Regex> for KeyPattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}
