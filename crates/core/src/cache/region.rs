use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Expiry policy applied uniformly to every region.
///
/// Entries expire a fixed duration after they are written; reads do not
/// extend their lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    ttl_seconds: u64,
}

impl ExpiryPolicy {
    /// Creates a created-expiry policy. A zero duration is raised to one
    /// second, since the backends cannot express "expire immediately".
    pub fn after_creation(ttl: Duration) -> Self {
        Self {
            ttl_seconds: ttl.as_secs().max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Point-in-time statistics for one region.
///
/// Hit, miss, put and removal counts are local to the process; the entry
/// count is read from the backing store and is shared by all processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStats {
    pub region: String,
    pub key_prefix: String,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub removals: u64,
    pub entry_count: u64,
}

impl RegionStats {
    /// Hit ratio in `[0.0, 1.0]`, or `None` before any read.
    pub fn hit_ratio(&self) -> Option<f64> {
        let reads = self.hits + self.misses;
        if reads == 0 {
            None
        } else {
            Some(self.hits as f64 / reads as f64)
        }
    }
}
