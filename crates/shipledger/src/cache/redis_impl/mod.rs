//! Redis cache backend implementation.
//!
//! Provides a distributed region store on a single Redis node or a Redis
//! cluster, with a pooled command connection set and dedicated subscriber
//! connections for invalidation broadcast.

mod connection;
mod error;
mod store;

pub use store::RedisRegionStore;
