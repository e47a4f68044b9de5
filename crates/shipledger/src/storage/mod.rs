//! Storage backend implementations.
//!
//! Concrete implementations of the repository and association loader traits
//! defined in `shipledger_core`, plus the cache-aside decorators that sit in
//! front of them.

pub mod cached;
pub mod sqlite;

pub use cached::{CachedOrderRepository, OrderRegions};
pub use sqlite::SqliteRepository;
