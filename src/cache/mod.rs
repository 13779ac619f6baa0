//! Entry store - tiered key-value storage with TTL and version stamps.
//!
//! ## Tiers
//!
//! - `Transient` - process memory, bounded by `max_size` with FIFO (or LRU)
//!   eviction
//! - `Durable` - JSON envelopes in a [`Storage`] medium that survives restarts
//!   when backed by [`FileStorage`]
//! - `Session` - JSON envelopes in a medium living as long as the store
//!
//! A key is only found in the tier it was written to.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use tagcache::cache::{EntryStore, GetOptions, SetOptions, StoreConfig};
//!
//! let store = EntryStore::new(StoreConfig::with_capacity(100));
//! store.set("user:42", "Ann".to_string(), SetOptions::new().ttl(Duration::from_secs(1)));
//! assert_eq!(store.get::<String>("user:42", &GetOptions::new()).as_deref(), Some("Ann"));
//! ```

mod clock;
mod config;
mod entry;
mod storage;
mod store;
mod transient;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EvictionPolicy, StoreConfig};
pub use entry::{CacheEntry, Envelope, GetOptions, RemovalCause, RemovalListener, SetOptions, Tier};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{EntryStore, EntryStoreBuilder, StoreStats};
