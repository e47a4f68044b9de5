//! Cached repository decorators.
//!
//! The decorators implement the cache-aside pattern over provisioned cache
//! regions:
//!
//! - **Reads**: Check the region first, on miss fetch from the repository and
//!   populate the region
//! - **Writes**: Persist to the repository, then invalidate the entry
//!
//! # Example
//!
//! ```ignore
//! let repo = Arc::new(SqliteRepository::new("shipledger.db").await?);
//! let regions = OrderRegions::provision(&provisioner).await?;
//! let orders = CachedOrderRepository::new(repo, regions);
//! ```

mod order;

pub use order::{CachedAssociation, CachedOrderRepository, OrderRegions};
