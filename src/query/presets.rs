//! Preset query shapes and invalidation plans.
//!
//! Both are thin compositions over [`QueryCache`]: presets fix a key
//! template, a tag set and a TTL; plans collect the tags a mutation touches
//! and hand them to `invalidate_by_tags`.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::cache::QueryCache;
use super::options::{QueryOptions, QueryResult};

/// Preset time-to-live values.
pub mod ttl {
    use std::time::Duration;

    pub const SHORT: Duration = Duration::from_secs(60); // 1 minute
    pub const MEDIUM: Duration = Duration::from_secs(300); // 5 minutes
    pub const LONG: Duration = Duration::from_secs(1800); // 30 minutes
}

/// Key for a single entity, `"kind:id"`.
pub fn entity_key(kind: &str, id: impl std::fmt::Display) -> String {
    format!("{kind}:{id}")
}

/// Tag covering every entity of a kind, `"kinds"`.
pub fn collection_tag(kind: &str) -> String {
    format!("{kind}s")
}

/// "Entity by id" lookup: keyed and tagged by the entity, also tagged by its
/// collection, cached for [`ttl::MEDIUM`].
#[derive(Debug, Clone)]
pub struct EntityQuery {
    key: String,
    tags: Vec<String>,
    ttl: Duration,
}

impl EntityQuery {
    pub fn new(kind: &str, id: impl std::fmt::Display) -> Self {
        let key = entity_key(kind, id);
        Self {
            tags: vec![key.clone(), collection_tag(kind)],
            key,
            ttl: ttl::MEDIUM,
        }
    }

    /// Also tag the entry with its owner, e.g. the client a campaign belongs to.
    #[must_use]
    pub fn owned_by(mut self, kind: &str, id: impl std::fmt::Display) -> Self {
        self.tags.push(entity_key(kind, id));
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn options(&self) -> QueryOptions {
        QueryOptions::new().ttl(self.ttl).tags(self.tags.iter().cloned())
    }

    /// Run the lookup through `cache`.
    pub async fn run<T, E, F, Fut>(&self, cache: &QueryCache, fetch: F) -> Result<QueryResult<T>, E>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        cache.query(&self.key, fetch, self.options()).await
    }
}

/// Tags to invalidate after a mutation.
///
/// ```rust
/// use tagcache::query::InvalidationPlan;
///
/// // A campaign ran: drop the campaign, its client's views and the rollups.
/// let plan = InvalidationPlan::new()
///     .entity("campaign", 7)
///     .entity("client", 99)
///     .scope("executions")
///     .scope("analytics");
/// assert_eq!(plan.tags(), ["campaign:7", "client:99", "executions", "analytics"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InvalidationPlan {
    tags: Vec<String>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate a single entity's tag.
    #[must_use]
    pub fn entity(self, kind: &str, id: impl std::fmt::Display) -> Self {
        self.scope(entity_key(kind, id))
    }

    /// Invalidate every entity of a kind.
    #[must_use]
    pub fn collection(self, kind: &str) -> Self {
        self.scope(collection_tag(kind))
    }

    /// Invalidate an arbitrary tag.
    #[must_use]
    pub fn scope(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Apply the plan. Returns the number of keys invalidated.
    pub fn apply(&self, cache: &QueryCache) -> usize {
        cache.invalidate_by_tags(self.tags.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::query::QueryCacheConfig;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Campaign {
        id: u32,
        client: u32,
    }

    #[test]
    fn test_entity_query_shape() {
        let query = EntityQuery::new("campaign", 7).owned_by("client", 99);

        assert_eq!(query.key(), "campaign:7");
        assert_eq!(query.tags(), ["campaign:7", "campaigns", "client:99"]);
        assert_eq!(query.options().ttl, Some(ttl::MEDIUM));
    }

    #[test]
    fn test_plan_deduplicates_tags() {
        let plan = InvalidationPlan::new()
            .collection("campaign")
            .scope("campaigns")
            .entity("client", 1);

        assert_eq!(plan.tags(), ["campaigns", "client:1"]);
    }

    #[tokio::test]
    async fn test_plan_invalidates_owned_entities() {
        let cache = QueryCache::new("presets", QueryCacheConfig::default());

        for (id, client) in [(1, 99), (2, 99), (3, 100)] {
            EntityQuery::new("campaign", id)
                .owned_by("client", client)
                .run(&cache, || async move { Ok::<_, ()>(Campaign { id, client }) })
                .await
                .unwrap();
        }

        let removed = InvalidationPlan::new().entity("client", 99).apply(&cache);

        assert_eq!(removed, 2);
        let rerun = EntityQuery::new("campaign", 3)
            .run(&cache, || async { Err::<Campaign, _>("should not fetch") })
            .await
            .unwrap();
        assert!(rerun.cached);
        assert_eq!(cache.stats().tags["campaigns"], 1);
    }
}
