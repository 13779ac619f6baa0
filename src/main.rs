//! Tagcache demo.
//!
//! Runs a simulated upstream through a query cache to show hits, misses,
//! tag invalidation and pattern invalidation, then prints the cache stats.
//!
//! Configuration comes from the environment, see [`tagcache::Config`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use tagcache::query::{EntityQuery, InvalidationPlan, ttl};
use tagcache::{CacheRegistry, Config, QueryOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Campaign {
    id: u32,
    client_id: u32,
    name: String,
}

/// Stand-in for a slow database or remote API.
#[derive(Default)]
struct Upstream {
    calls: AtomicUsize,
}

impl Upstream {
    async fn campaign(&self, id: u32, client_id: u32) -> anyhow::Result<Campaign> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Campaign {
            id,
            client_id,
            name: format!("Campaign {id}"),
        })
    }

    async fn client_assets(&self, client_id: u32) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(vec![format!("logo-{client_id}.png"), format!("banner-{client_id}.png")])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tagcache::logging::init();

    info!("Starting tagcache demo...");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: max_size={}, default_ttl={:?}, eviction={}",
        config.store.max_size, config.store.default_ttl, config.store.eviction
    );

    // One registry for the whole process, handed to whoever needs a cache
    let registry = CacheRegistry::new();
    let api = registry.insert(config.build_cache("api"));

    let upstream = Upstream::default();

    // Miss, then hit
    for _ in 0..2 {
        let result = EntityQuery::new("campaign", 7)
            .owned_by("client", 99)
            .run(&api, || upstream.campaign(7, 99))
            .await?;
        info!("campaign:7 -> {:?} (cached: {})", result.data.name, result.cached);
    }

    // Two concurrent misses on the same key
    let (a, b) = futures::future::join(
        api.query("campaign:8", || upstream.campaign(8, 99), QueryOptions::new().tag("client:99")),
        api.query("campaign:8", || upstream.campaign(8, 99), QueryOptions::new().tag("client:99")),
    )
    .await;
    info!("Concurrent campaign:8 lookups cached: {} / {}", a?.cached, b?.cached);

    api.query(
        "client:42:assets",
        || upstream.client_assets(42),
        QueryOptions::new().ttl(ttl::LONG).tag("assets"),
    )
    .await?;

    // A campaign for client 99 ran: drop everything tagged with it
    let removed = InvalidationPlan::new()
        .entity("client", 99)
        .scope("executions")
        .apply(&api);
    info!("Invalidated {} entries after campaign execution", removed);

    let removed = api.invalidate_by_pattern("client:42");
    info!("Invalidated {} entries for client 42", removed);

    let result = EntityQuery::new("campaign", 7)
        .owned_by("client", 99)
        .run(&api, || upstream.campaign(7, 99))
        .await?;
    info!("campaign:7 after invalidation (cached: {})", result.cached);

    info!("Upstream was called {} times", upstream.calls());
    println!("{}", serde_json::to_string_pretty(&registry.stats())?);

    Ok(())
}
