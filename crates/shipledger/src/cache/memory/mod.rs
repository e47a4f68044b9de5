//! In-memory cache backend implementation.
//!
//! Provides a thread-safe in-memory region store with TTL support for
//! single-instance deployments.

mod store;

pub use store::MemoryRegionStore;
