//! Query cache - memoized fetches with tag and pattern invalidation.
//!
//! ## Usage
//!
//! ```rust
//! use tagcache::query::{QueryCache, QueryCacheConfig, QueryOptions};
//!
//! # async fn demo() -> Result<(), std::io::Error> {
//! let cache = QueryCache::new("api", QueryCacheConfig::default());
//!
//! let campaign = cache
//!     .query(
//!         "campaign:7",
//!         || async { Ok::<_, std::io::Error>(7u32) },
//!         QueryOptions::new().tags(["campaigns", "client:99"]),
//!     )
//!     .await?;
//! assert!(!campaign.cached);
//!
//! // After the client changes, drop everything tagged with it.
//! cache.invalidate_by_tags(&["client:99"]);
//! # Ok(())
//! # }
//! ```

mod cache;
mod options;
mod presets;
mod tags;

pub use cache::{QueryCache, QueryCacheConfig, QueryCacheStats};
pub use options::{KeyPattern, QueryOptions, QueryResult};
pub use presets::{EntityQuery, InvalidationPlan, collection_tag, entity_key, ttl};
pub use tags::TagIndex;
