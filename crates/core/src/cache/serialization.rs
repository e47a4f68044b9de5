//! Pure functions for serializing values to and from cache payloads.
//!
//! Values are stored as JSON so cached entries stay human-readable and easy
//! to inspect with `redis-cli`.

use serde::{de::DeserializeOwned, Serialize};

use super::{CacheError, Result};

/// Serializes a value to a JSON cache payload.
pub fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Deserializes a JSON cache payload.
pub fn deserialize_value<T: DeserializeOwned>(payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|e| CacheError::Serialization(e.to_string()))
}
