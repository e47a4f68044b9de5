//! Handle to one provisioned cache region.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use shipledger_core::cache::{
    deserialize_value, namespaced_key, serialize_value, ExpiryPolicy, KeyPrefix, RegionStats,
    RegionStore, Result,
};

/// A named cache region with its key prefix, expiry policy and statistics.
///
/// Cloning is cheap and every clone shares the same counters. Entry
/// operations go straight to the backing store without any lock.
pub struct RegionHandle<S> {
    inner: Arc<RegionInner<S>>,
}

struct RegionInner<S> {
    name: String,
    prefix: KeyPrefix,
    expiry: ExpiryPolicy,
    store: Arc<S>,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    removals: AtomicU64,
}

impl<S> Clone for RegionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RegionStore> RegionHandle<S> {
    pub(crate) fn new(
        name: impl Into<String>,
        store: Arc<S>,
        prefix: KeyPrefix,
        expiry: ExpiryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(RegionInner {
                name: name.into(),
                prefix,
                expiry,
                store,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                puts: AtomicU64::new(0),
                removals: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns true if both handles refer to the same provisioned region.
    #[cfg(test)]
    pub fn same_region(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn key(&self, key: &str) -> String {
        namespaced_key(&self.inner.prefix, key)
    }

    /// Reads and deserializes an entry.
    ///
    /// An entry that fails to deserialize counts as a miss and is reported
    /// as [`CacheError::Serialization`](shipledger_core::cache::CacheError).
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let payload = self.inner.store.get(&self.inner.name, &self.key(key)).await?;

        let Some(payload) = payload else {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        match deserialize_value(&payload) {
            Ok(value) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Err(err) => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Serializes and stores an entry under the region's expiry policy.
    pub async fn put<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serialize_value(value)?;
        self.inner
            .store
            .put(&self.inner.name, &self.key(key), &payload, self.inner.expiry.ttl())
            .await?;
        self.inner.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the cached value, or loads it, caches it and returns it.
    ///
    /// Cache failures are logged and treated as a miss; only `load` errors
    /// are returned.
    pub async fn get_or_insert_with<T, E, F, Fut>(
        &self,
        key: &str,
        load: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, E>> + Send,
    {
        match self.get::<T>(key).await {
            Ok(Some(value)) => {
                tracing::trace!(region = %self.name(), key, "Cache hit");
                return Ok(value);
            }
            Ok(None) => tracing::trace!(region = %self.name(), key, "Cache miss"),
            Err(err) => {
                tracing::warn!(region = %self.name(), key, error = %err, "Cache read failed")
            }
        }

        let value = load().await?;

        if let Err(err) = self.put(key, &value).await {
            tracing::warn!(region = %self.name(), key, error = %err, "Failed to populate cache");
        }

        Ok(value)
    }

    /// Removes an entry.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.inner
            .store
            .remove(&self.inner.name, &self.key(key))
            .await?;
        self.inner.removals.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Removes every entry of the region, for all deployments.
    pub async fn clear(&self) -> Result<()> {
        self.inner.store.clear_region(&self.inner.name).await
    }

    /// Current statistics. The entry count is read from the store.
    pub async fn stats(&self) -> Result<RegionStats> {
        let entry_count = self.inner.store.entry_count(&self.inner.name).await?;

        Ok(RegionStats {
            region: self.inner.name.clone(),
            key_prefix: self.inner.prefix.to_string(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            puts: self.inner.puts.load(Ordering::Relaxed),
            removals: self.inner.removals.load(Ordering::Relaxed),
            entry_count,
        })
    }
}

impl<S> std::fmt::Debug for RegionHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionHandle")
            .field("name", &self.inner.name)
            .field("prefix", &self.inner.prefix)
            .field("expiry", &self.inner.expiry)
            .finish()
    }
}
