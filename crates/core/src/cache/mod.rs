mod error;
mod keys;
mod prefix;
mod region;
mod serialization;
mod topology;
mod traits;

pub use error::{CacheError, Result, TopologyError};
pub use keys::{
    extract_region_from_key, namespaced_key, region_channel, region_entry_key,
    region_marker_key, region_tracking_key, validate_region_name, MAX_REGION_NAME_LEN,
};
pub use prefix::{KeyPrefix, PLACEHOLDER_PREFIX};
pub use region::{ExpiryPolicy, RegionStats};
pub use serialization::{deserialize_value, serialize_value};
pub use topology::{
    CacheTopology, Credential, Endpoint, PoolSettings, ServerLayout, DEFAULT_REDIS_PORT,
};
pub use traits::RegionStore;
