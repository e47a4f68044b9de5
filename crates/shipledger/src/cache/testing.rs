//! In-process `RegionStore` used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use shipledger_core::cache::{CacheError, ExpiryPolicy, RegionStore, Result};

/// Mock store that records calls and can be told to fail.
pub struct MockRegionStore {
    markers: RwLock<HashMap<String, ExpiryPolicy>>,
    entries: RwLock<HashMap<(String, String), String>>,
    last_ttl: RwLock<Option<Duration>>,
    creates: AtomicUsize,
    clears: AtomicUsize,
    fail_reads: AtomicBool,
    fail_connect: AtomicBool,
}

impl MockRegionStore {
    pub fn new() -> Self {
        Self {
            markers: RwLock::new(HashMap::new()),
            entries: RwLock::new(HashMap::new()),
            last_ttl: RwLock::new(None),
            creates: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
        }
    }

    /// Pretends a peer process already created the region.
    pub async fn with_existing_region(self, region: &str, stale_keys: &[&str]) -> Self {
        self.markers.write().await.insert(
            region.to_string(),
            ExpiryPolicy::after_creation(Duration::from_secs(60)),
        );
        let mut entries = self.entries.write().await;
        for key in stale_keys {
            entries.insert((region.to_string(), key.to_string()), "stale".to_string());
        }
        drop(entries);
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes region creation fail as if the server were unreachable.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub async fn last_ttl(&self) -> Option<Duration> {
        *self.last_ttl.read().await
    }

    pub async fn policy(&self, region: &str) -> Option<ExpiryPolicy> {
        self.markers.read().await.get(region).copied()
    }
}

#[async_trait]
impl RegionStore for MockRegionStore {
    async fn create_region(&self, region: &str, policy: &ExpiryPolicy) -> Result<bool> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionFailed("connection refused".to_string()));
        }
        let mut markers = self.markers.write().await;
        if markers.contains_key(region) {
            return Ok(false);
        }
        markers.insert(region.to_string(), *policy);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn clear_region(&self, region: &str) -> Result<()> {
        self.entries.write().await.retain(|(r, _), _| r != region);
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, region: &str, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::OperationFailed("read failed".to_string()));
        }
        Ok(self
            .entries
            .read()
            .await
            .get(&(region.to_string(), key.to_string()))
            .cloned())
    }

    async fn put(&self, region: &str, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .write()
            .await
            .insert((region.to_string(), key.to_string()), value.to_string());
        *self.last_ttl.write().await = Some(ttl);
        Ok(())
    }

    async fn remove(&self, region: &str, key: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .remove(&(region.to_string(), key.to_string()));
        Ok(())
    }

    async fn entry_count(&self, region: &str) -> Result<u64> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|(r, _)| r == region)
            .count() as u64)
    }
}
