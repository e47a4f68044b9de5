//! In-memory region store with LRU eviction.
//!
//! Provides a thread-safe store with TTL support using tokio synchronization
//! primitives and an LRU eviction policy. It mirrors the Redis layout: every
//! entry is stored under its physical key and tracked per region, so clearing
//! a region never walks the whole store.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use lru::LruCache;
use tokio::sync::{broadcast, RwLock};

use shipledger_core::cache::{
    extract_region_from_key, region_entry_key, ExpiryPolicy, RegionStore, Result,
};

use crate::cache::InvalidationSource;

/// Capacity of the in-process invalidation channel.
const EVENT_CAPACITY: usize = 256;

/// A single cache entry with its expiration instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-memory region store for single-instance deployments and tests.
///
/// Expired entries are dropped lazily when read or counted, and evicted
/// entries are untracked as soon as the LRU drops them, so the per-region
/// tracking never outgrows the store. Invalidations are broadcast to
/// subscribers within this process only.
#[derive(Debug, Clone)]
pub struct MemoryRegionStore {
    /// Main key-value store with LRU eviction.
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Physical entry keys per region.
    tracking: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    /// Region markers.
    regions: Arc<RwLock<HashMap<String, ExpiryPolicy>>>,
    events: broadcast::Sender<String>,
}

impl MemoryRegionStore {
    /// Creates a store holding at most `max_entries` entries across all
    /// regions. A capacity of zero is raised to one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            tracking: Arc::new(RwLock::new(HashMap::new())),
            regions: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Stops tracking a physical key unless it was written again meanwhile.
    ///
    /// Lock order is tracking, then store, matching `entry_count`.
    async fn untrack_if_absent(&self, physical: &str) {
        let Some(region) = extract_region_from_key(physical) else {
            return;
        };

        let mut tracking = self.tracking.write().await;
        let store = self.store.read().await;
        if store.peek(physical).is_some() {
            return;
        }
        if let Some(keys) = tracking.get_mut(region) {
            keys.remove(physical);
            if keys.is_empty() {
                tracking.remove(region);
            }
        }
    }

    #[cfg(test)]
    async fn tracked_len(&self, region: &str) -> usize {
        self.tracking
            .read()
            .await
            .get(region)
            .map_or(0, HashSet::len)
    }
}

#[async_trait]
impl RegionStore for MemoryRegionStore {
    async fn create_region(&self, region: &str, policy: &ExpiryPolicy) -> Result<bool> {
        let mut regions = self.regions.write().await;
        if regions.contains_key(region) {
            return Ok(false);
        }
        regions.insert(region.to_string(), *policy);
        Ok(true)
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        let tracked_keys = {
            let mut tracking = self.tracking.write().await;
            tracking.remove(region).unwrap_or_default()
        };

        if !tracked_keys.is_empty() {
            let mut store = self.store.write().await;
            for key in &tracked_keys {
                store.pop(key);
            }
        }

        // No subscribers is not an error.
        let _ = self.events.send(region.to_string());
        Ok(())
    }

    async fn get(&self, region: &str, key: &str) -> Result<Option<String>> {
        let physical = region_entry_key(region, key);

        {
            let mut store = self.store.write().await;
            match store.get(&physical) {
                Some(entry) if entry.is_expired() => {
                    store.pop(&physical);
                }
                Some(entry) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
            }
        }

        self.untrack_if_absent(&physical).await;
        Ok(None)
    }

    async fn put(&self, region: &str, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let physical = region_entry_key(region, key);

        let evicted = {
            let mut store = self.store.write().await;
            store
                .push(physical.clone(), CacheEntry::new(value.to_string(), ttl))
                .map(|(key, _)| key)
                .filter(|key| *key != physical)
        };

        self.tracking
            .write()
            .await
            .entry(region.to_string())
            .or_default()
            .insert(physical);

        if let Some(evicted) = evicted {
            self.untrack_if_absent(&evicted).await;
        }

        Ok(())
    }

    async fn remove(&self, region: &str, key: &str) -> Result<()> {
        let physical = region_entry_key(region, key);

        {
            let mut tracking = self.tracking.write().await;
            if let Some(keys) = tracking.get_mut(region) {
                keys.remove(&physical);
                if keys.is_empty() {
                    tracking.remove(region);
                }
            }
        }

        let mut store = self.store.write().await;
        store.pop(&physical);

        Ok(())
    }

    async fn entry_count(&self, region: &str) -> Result<u64> {
        let mut tracking = self.tracking.write().await;
        let Some(keys) = tracking.get_mut(region) else {
            return Ok(0);
        };

        // Drop tracked keys that expired or were evicted.
        let mut store = self.store.write().await;
        keys.retain(|key| match store.peek(key) {
            Some(entry) if entry.is_expired() => {
                store.pop(key);
                false
            }
            Some(_) => true,
            None => false,
        });

        let live = keys.len();
        if live == 0 {
            tracking.remove(region);
        }

        Ok(live as u64)
    }
}

#[async_trait]
impl InvalidationSource for MemoryRegionStore {
    async fn invalidations(&self, region: &str) -> Result<BoxStream<'static, String>> {
        let region = region.to_string();
        let rx = self.events.subscribe();

        let feed = stream::unfold(rx, move |mut rx| {
            let region = region.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(cleared) if cleared == region => return Some((cleared, rx)),
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(feed.boxed())
    }
}
