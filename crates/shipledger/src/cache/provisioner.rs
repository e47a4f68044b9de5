//! Startup provisioning of cache regions.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::Mutex;

use shipledger_core::cache::{
    validate_region_name, ExpiryPolicy, KeyPrefix, RegionStats, RegionStore, Result,
};

use super::RegionHandle;

type Slot<S> = Arc<Mutex<Option<RegionHandle<S>>>>;

/// Owns the connection to the cache and hands out region handles.
///
/// The first `ensure_region` call for a name in this process decides between
/// creating the region and clearing stale entries left by a previous
/// deployment. Later calls return the same handle without touching the
/// store. The handle is constructed once at startup and passed explicitly to
/// whoever needs it.
pub struct CacheProvisioner<S> {
    store: Arc<S>,
    prefix: KeyPrefix,
    expiry: ExpiryPolicy,
    slots: Mutex<HashMap<String, Slot<S>>>,
}

impl<S: RegionStore> CacheProvisioner<S> {
    /// Wraps a connected store.
    pub fn new(store: Arc<S>, prefix: KeyPrefix, expiry: ExpiryPolicy) -> Self {
        if prefix.is_placeholder() {
            tracing::warn!(
                prefix = %prefix,
                "No build metadata available, cache keys use the placeholder prefix"
            );
        }

        Self {
            store,
            prefix,
            expiry,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn key_prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    pub fn expiry(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Shared store, for backend-specific operations such as invalidation
    /// feeds.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates the region, or clears it if it already exists, and returns its
    /// handle. Idempotent within the process.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidRegion`](shipledger_core::cache::CacheError)
    /// for names that cannot be embedded in a key, or the store's error if
    /// the create-or-clear round trip fails.
    pub async fn ensure_region(&self, name: &str) -> Result<RegionHandle<S>> {
        validate_region_name(name)?;

        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(name.to_string()).or_default())
        };

        let mut slot = slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        if self.store.create_region(name, &self.expiry).await? {
            tracing::info!(
                region = name,
                ttl_seconds = self.expiry.ttl().as_secs(),
                "Cache region created"
            );
        } else {
            self.store.clear_region(name).await?;
            tracing::info!(region = name, "Cache region already existed, cleared");
        }

        let handle = RegionHandle::new(
            name,
            Arc::clone(&self.store),
            self.prefix.clone(),
            self.expiry,
        );
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Provisions every name concurrently. Handles come back in input order.
    pub async fn ensure_regions(&self, names: &[&str]) -> Result<Vec<RegionHandle<S>>> {
        let handles = try_join_all(names.iter().map(|name| self.ensure_region(name))).await?;

        tracing::debug!(
            regions = handles.len(),
            prefix = %self.prefix,
            "Cache regions provisioned"
        );

        Ok(handles)
    }

    /// Returns the handle of an already provisioned region.
    pub async fn region(&self, name: &str) -> Option<RegionHandle<S>> {
        let slot = self.slots.lock().await.get(name).cloned()?;
        let handle = slot.lock().await.clone();
        handle
    }

    /// Statistics for every provisioned region, sorted by name.
    pub async fn stats(&self) -> Result<Vec<RegionStats>> {
        let slots: Vec<Slot<S>> = self.slots.lock().await.values().cloned().collect();

        let mut handles = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(handle) = slot.lock().await.clone() {
                handles.push(handle);
            }
        }

        let mut stats = try_join_all(handles.iter().map(|handle| handle.stats())).await?;
        stats.sort_by(|a, b| a.region.cmp(&b.region));
        Ok(stats)
    }
}
