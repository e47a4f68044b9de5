use std::time::Duration;

use async_trait::async_trait;

use super::{ExpiryPolicy, Result};

/// Storage operations a cache backend provides for named regions.
///
/// Keys passed to the entry operations are logical keys already namespaced
/// with the deployment prefix; implementations map them to physical keys.
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Atomically creates the region if it does not exist.
    ///
    /// Returns `true` if this call created it and `false` if it already
    /// existed (possibly created by a peer process).
    async fn create_region(&self, region: &str, policy: &ExpiryPolicy) -> Result<bool>;

    /// Removes every entry of the region while keeping the region itself.
    async fn clear_region(&self, region: &str) -> Result<()>;

    /// Gets an entry.
    async fn get(&self, region: &str, key: &str) -> Result<Option<String>>;

    /// Stores an entry that expires `ttl` after this write.
    async fn put(&self, region: &str, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Removes an entry.
    async fn remove(&self, region: &str, key: &str) -> Result<()>;

    /// Returns the number of entries tracked for the region.
    async fn entry_count(&self, region: &str) -> Result<u64>;
}
