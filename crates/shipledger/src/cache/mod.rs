//! Cache backend implementations and region provisioning.
//!
//! The backends implement `shipledger_core::cache::RegionStore`. The
//! implementation is selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `memory` (default): In-memory LRU store, single process only
//! - `redis`: Redis single node or cluster through `fred`
//!
//! These features are mutually exclusive - only one cache backend can be
//! enabled at a time.

// Compile-time checks for mutual exclusivity
#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!(
    "Features 'memory' and 'redis' are mutually exclusive. \
    Enable only one cache backend at a time."
);

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!(
    "No cache backend selected. Enable 'memory' or 'redis' feature. \
    Example: cargo build -p shipledger --no-default-features --features redis"
);

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use shipledger_core::cache::{CacheTopology, Result};

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

mod provisioner;
mod region;

#[cfg(test)]
pub(crate) mod testing;

pub use provisioner::CacheProvisioner;
pub use region::RegionHandle;

#[cfg(feature = "memory")]
pub use memory::MemoryRegionStore;

#[cfg(feature = "redis")]
pub use redis_impl::RedisRegionStore;

/// The region store selected by the enabled cache feature.
#[cfg(feature = "memory")]
pub type ActiveStore = MemoryRegionStore;

/// The region store selected by the enabled cache feature.
#[cfg(feature = "redis")]
pub type ActiveStore = RedisRegionStore;

/// Feed of region invalidations broadcast by any process sharing the cache.
#[async_trait]
pub trait InvalidationSource: Send + Sync {
    /// Subscribes to clears of `region`. Each item is the region name.
    async fn invalidations(&self, region: &str) -> Result<BoxStream<'static, String>>;
}

/// Connects the active backend. Fails if the initial handshake fails.
#[cfg(feature = "memory")]
pub async fn connect(
    topology: &CacheTopology,
    _timeout: std::time::Duration,
    max_entries: usize,
) -> Result<ActiveStore> {
    tracing::info!(
        topology = %topology,
        max_entries,
        "Using in-memory cache backend, cache servers are not contacted"
    );
    Ok(MemoryRegionStore::new(max_entries))
}

/// Connects the active backend. Fails if the initial handshake fails.
#[cfg(feature = "redis")]
pub async fn connect(
    topology: &CacheTopology,
    timeout: std::time::Duration,
    _max_entries: usize,
) -> Result<ActiveStore> {
    RedisRegionStore::connect(topology, timeout).await
}
