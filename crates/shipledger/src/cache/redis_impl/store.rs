//! Redis region store.
//!
//! Entry keys are tracked per region in a sorted set scored by their expiry
//! time (Unix milliseconds) so that clearing a region never needs SCAN. Every
//! `put` trims members whose expiry has passed, which bounds the set by the
//! number of entries written within one TTL. All keys of a region share one
//! hash tag, which keeps the multi-key DEL and EXISTS calls valid in cluster
//! mode.
//!
//! # Non-Atomicity Safety
//!
//! `put`, `remove` and `clear_region` issue several commands. A crash between
//! them can leave tracked members whose keys no longer exist; DEL and ZREM on
//! missing keys are no-ops, `entry_count` checks liveness with EXISTS, and
//! the next trim drops the member once its score has passed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fred::clients::SubscriberClient;
use fred::prelude::*;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use shipledger_core::cache::{
    region_channel, region_entry_key, region_marker_key, region_tracking_key, serialize_value,
    CacheError, CacheTopology, ExpiryPolicy, RegionStore, Result,
};

use super::connection::{connect, Connections};
use super::error::map_fred_error;
use crate::cache::InvalidationSource;

/// Keys per DEL / EXISTS command when walking a tracking set.
const KEY_BATCH: usize = 500;

/// Redis region store backed by a fred connection pool.
#[derive(Clone)]
pub struct RedisRegionStore {
    pool: Pool,
    subscribers: Arc<Vec<SubscriberClient>>,
}

impl RedisRegionStore {
    /// Connects to the deployment described by `topology`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the initial handshake fails.
    pub async fn connect(topology: &CacheTopology, timeout: Duration) -> Result<Self> {
        let Connections { pool, subscribers } = connect(topology, timeout).await?;
        Ok(Self {
            pool,
            subscribers: Arc::new(subscribers),
        })
    }

    /// Picks the subscriber connection that carries a region's channel.
    fn subscriber_for(&self, region: &str) -> Option<&SubscriberClient> {
        if self.subscribers.is_empty() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        region.hash(&mut hasher);
        let index = (hasher.finish() % self.subscribers.len() as u64) as usize;
        self.subscribers.get(index)
    }

    async fn tracked_keys(&self, region: &str) -> Result<Vec<String>> {
        self.pool
            .zrange(
                region_tracking_key(region),
                0_i64,
                -1_i64,
                None,
                false,
                None,
                false,
            )
            .await
            .map_err(map_fred_error)
    }

    /// Drops tracked members whose entries have already expired.
    async fn trim_expired(&self, region: &str) -> Result<()> {
        self.pool
            .zremrangebyscore::<(), _, _, _>(
                region_tracking_key(region),
                "-inf",
                Utc::now().timestamp_millis() as f64,
            )
            .await
            .map_err(map_fred_error)
    }
}

#[async_trait]
impl RegionStore for RedisRegionStore {
    async fn create_region(&self, region: &str, policy: &ExpiryPolicy) -> Result<bool> {
        let payload = serialize_value(policy)?;

        // SET NX answers OK when it wrote the marker and nil otherwise.
        let created: Option<String> = self
            .pool
            .set(
                region_marker_key(region),
                payload,
                None,
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(map_fred_error)?;

        Ok(created.is_some())
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        let tracked_keys = self.tracked_keys(region).await?;

        for batch in tracked_keys.chunks(KEY_BATCH) {
            self.pool
                .del::<(), _>(batch.to_vec())
                .await
                .map_err(map_fred_error)?;
        }

        self.pool
            .del::<(), _>(region_tracking_key(region))
            .await
            .map_err(map_fred_error)?;

        if let Err(err) = self
            .pool
            .next()
            .publish::<(), _, _>(region_channel(region), region)
            .await
        {
            let err = CacheError::PublishFailed(err.to_string());
            tracing::warn!(region, error = %err, "Failed to broadcast region invalidation");
        }

        tracing::debug!(region, removed = tracked_keys.len(), "Cache region cleared");
        Ok(())
    }

    async fn get(&self, region: &str, key: &str) -> Result<Option<String>> {
        self.pool
            .get(region_entry_key(region, key))
            .await
            .map_err(map_fred_error)
    }

    async fn put(&self, region: &str, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let physical = region_entry_key(region, key);
        let seconds = ttl.as_secs().max(1) as i64;
        let expires_at = Utc::now().timestamp_millis() + seconds * 1000;

        self.pool
            .set::<(), _, _>(
                physical.as_str(),
                value,
                Some(Expiration::EX(seconds)),
                None,
                false,
            )
            .await
            .map_err(map_fred_error)?;

        self.pool
            .zadd::<(), _, _>(
                region_tracking_key(region),
                None,
                None,
                false,
                false,
                (expires_at as f64, physical),
            )
            .await
            .map_err(map_fred_error)?;

        self.trim_expired(region).await
    }

    async fn remove(&self, region: &str, key: &str) -> Result<()> {
        let physical = region_entry_key(region, key);

        self.pool
            .del::<(), _>(physical.as_str())
            .await
            .map_err(map_fred_error)?;

        self.pool
            .zrem::<(), _, _>(region_tracking_key(region), physical)
            .await
            .map_err(map_fred_error)?;

        Ok(())
    }

    async fn entry_count(&self, region: &str) -> Result<u64> {
        self.trim_expired(region).await?;
        let tracked_keys = self.tracked_keys(region).await?;

        // Tracked keys may have been evicted by the server.
        let mut live = 0;
        for batch in tracked_keys.chunks(KEY_BATCH) {
            let count: u64 = self
                .pool
                .exists(batch.to_vec())
                .await
                .map_err(map_fred_error)?;
            live += count;
        }

        Ok(live)
    }
}

#[async_trait]
impl InvalidationSource for RedisRegionStore {
    async fn invalidations(&self, region: &str) -> Result<BoxStream<'static, String>> {
        let subscriber = self.subscriber_for(region).ok_or_else(|| {
            CacheError::OperationFailed("no subscription connections configured".to_string())
        })?;

        let channel = region_channel(region);
        let rx = subscriber.message_rx();
        subscriber
            .subscribe(channel.clone())
            .await
            .map_err(map_fred_error)?;

        let region = region.to_string();
        let feed = stream::unfold(rx, move |mut rx| {
            let channel = channel.clone();
            let region = region.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(message) if &*message.channel == channel.as_str() => {
                            return Some((region, rx))
                        }
                        Ok(_) | Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(feed.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipledger_core::cache::PoolSettings;
    use uuid::Uuid;

    const TTL: Duration = Duration::from_secs(60);

    /// Helper to get Redis URL from environment.
    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Skip test if Redis not available.
    async fn get_test_store() -> Option<RedisRegionStore> {
        let topology = CacheTopology::parse(
            false,
            &[redis_url()],
            PoolSettings {
                connection_pool_size: 2,
                minimum_idle_connections: 1,
                subscription_pool_size: 1,
            },
        )
        .ok()?;
        RedisRegionStore::connect(&topology, Duration::from_secs(2))
            .await
            .ok()
    }

    /// Generate a unique region name to avoid conflicts.
    fn test_region() -> String {
        format!("test-{}", Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_redis_create_region_once() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let region = test_region();
        let policy = ExpiryPolicy::after_creation(TTL);

        assert!(store.create_region(&region, &policy).await.unwrap());
        assert!(!store.create_region(&region, &policy).await.unwrap());

        // Clean up
        store
            .pool
            .del::<(), _>(region_marker_key(&region))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_redis_put_get_remove() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let region = test_region();

        store.put(&region, "p:1", "value", TTL).await.unwrap();
        assert_eq!(
            store.get(&region, "p:1").await.unwrap().as_deref(),
            Some("value")
        );
        assert_eq!(store.entry_count(&region).await.unwrap(), 1);

        store.remove(&region, "p:1").await.unwrap();
        assert!(store.get(&region, "p:1").await.unwrap().is_none());
        assert_eq!(store.entry_count(&region).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_redis_ttl() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let region = test_region();

        store
            .put(&region, "p:1", "expiring", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(store.get(&region, "p:1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(store.get(&region, "p:1").await.unwrap().is_none());
        assert_eq!(store.entry_count(&region).await.unwrap(), 0);

        store.clear_region(&region).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_put_trims_expired_tracking() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let region = test_region();

        for n in 0..20 {
            store
                .put(&region, &format!("p:{n}"), "short", Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(store.tracked_keys(&region).await.unwrap().len(), 20);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        store.put(&region, "p:kept", "long", TTL).await.unwrap();

        let tracked = store.tracked_keys(&region).await.unwrap();
        assert_eq!(tracked, vec![region_entry_key(&region, "p:kept")]);
        assert_eq!(store.entry_count(&region).await.unwrap(), 1);

        store.clear_region(&region).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_clear_region_keeps_other_regions() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let cleared = test_region();
        let kept = test_region();

        store.put(&cleared, "p:1", "a", TTL).await.unwrap();
        store.put(&cleared, "p:2", "b", TTL).await.unwrap();
        store.put(&kept, "p:1", "c", TTL).await.unwrap();

        store.clear_region(&cleared).await.unwrap();

        assert_eq!(store.entry_count(&cleared).await.unwrap(), 0);
        assert!(store.get(&cleared, "p:1").await.unwrap().is_none());
        assert_eq!(store.entry_count(&kept).await.unwrap(), 1);

        // Clean up
        store.clear_region(&kept).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_clear_region_is_broadcast() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let region = test_region();
        let mut feed = store.invalidations(&region).await.unwrap();

        store.clear_region(&region).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), feed.next())
            .await
            .unwrap();
        assert_eq!(received, Some(region));
    }
}
