//! Tagcache - tiered memoization with tag-based invalidation.
//!
//! ## Architecture
//!
//! - `cache` - Entry store: TTL and version aware storage across
//!   transient, durable and session tiers
//! - `query` - Query cache: memoized async fetches plus a reverse tag index
//!   for bulk invalidation by tag or key pattern
//! - `registry` - Named query caches, built once and passed by reference
//! - `config` - Environment configuration
//! - `logging` - Tracing subscriber setup

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
mod registry;

pub use config::Config;
pub use error::{ConfigError, StorageError};
pub use query::{QueryCache, QueryCacheConfig, QueryOptions, QueryResult};
pub use registry::CacheRegistry;
