//! Physical key layout for cache regions.
//!
//! Every key belonging to a region carries the region name inside a Redis
//! hash tag (`{region}`), so a region's entries, its tracking set and its
//! marker always land in the same cluster slot. Multi-key commands against a
//! single region are therefore valid in cluster mode.
//!
//! Layout for a region named `orders`:
//!
//! | Key                                | Purpose                          |
//! |------------------------------------|----------------------------------|
//! | `cache:{orders}:_region`           | Region marker (expiry policy)    |
//! | `cache:{orders}:_keys`             | Set of live entry keys           |
//! | `cache:{orders}:_events`           | Pub/sub invalidation channel     |
//! | `cache:{orders}:<prefix>:<key>`    | One cached entry                 |

use super::{CacheError, KeyPrefix, Result};

const NAMESPACE: &str = "cache";

/// Maximum length of a region name.
pub const MAX_REGION_NAME_LEN: usize = 200;

/// Validates a region name before it is embedded in a key.
///
/// Region names become part of a Redis hash tag, so braces, colons, glob
/// characters and whitespace are rejected.
pub fn validate_region_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > MAX_REGION_NAME_LEN {
        Some("must be at most 200 characters")
    } else if name
        .chars()
        .any(|c| matches!(c, '{' | '}' | ':' | '*' | '?' | '[' | ']') || c.is_whitespace())
    {
        Some("must not contain braces, colons, glob characters or whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CacheError::InvalidRegion {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Returns the marker key recording that a region exists.
pub fn region_marker_key(region: &str) -> String {
    format!("{NAMESPACE}:{{{region}}}:_region")
}

/// Returns the set key tracking every entry key stored in a region.
///
/// Clearing a region reads this set instead of scanning the keyspace.
pub fn region_tracking_key(region: &str) -> String {
    format!("{NAMESPACE}:{{{region}}}:_keys")
}

/// Returns the pub/sub channel on which region invalidations are broadcast.
pub fn region_channel(region: &str) -> String {
    format!("{NAMESPACE}:{{{region}}}:_events")
}

/// Returns the physical key of an entry whose logical key has already been
/// namespaced with [`namespaced_key`].
pub fn region_entry_key(region: &str, namespaced: &str) -> String {
    format!("{NAMESPACE}:{{{region}}}:{namespaced}")
}

/// Prepends the deployment prefix to a logical key.
pub fn namespaced_key(prefix: &KeyPrefix, key: &str) -> String {
    format!("{}:{}", prefix.as_str(), key)
}

/// Extracts the region name from any key produced by this module.
///
/// # Examples
///
/// ```
/// use shipledger_core::cache::{extract_region_from_key, region_tracking_key};
///
/// let key = region_tracking_key("orders.items");
/// assert_eq!(extract_region_from_key(&key), Some("orders.items"));
///
/// assert_eq!(extract_region_from_key("session:123"), None);
/// ```
pub fn extract_region_from_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(NAMESPACE)?.strip_prefix(":{")?;
    let end = rest.find('}')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_marker_key() {
        assert_eq!(region_marker_key("orders"), "cache:{orders}:_region");
    }

    #[test]
    fn test_region_tracking_key() {
        assert_eq!(region_tracking_key("orders"), "cache:{orders}:_keys");
    }

    #[test]
    fn test_region_channel() {
        assert_eq!(region_channel("orders.items"), "cache:{orders.items}:_events");
    }

    #[test]
    fn test_region_entry_key_with_prefix() {
        let prefix = KeyPrefix::new("1.4.0+abc1234");
        let namespaced = namespaced_key(&prefix, "42");
        assert_eq!(namespaced, "1.4.0+abc1234:42");
        assert_eq!(
            region_entry_key("orders", &namespaced),
            "cache:{orders}:1.4.0+abc1234:42"
        );
    }

    #[test]
    fn test_entry_keys_differ_across_prefixes() {
        let a = region_entry_key("orders", &namespaced_key(&KeyPrefix::new("build-a"), "1"));
        let b = region_entry_key("orders", &namespaced_key(&KeyPrefix::new("build-b"), "1"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_key_never_collides_with_internal_keys() {
        let prefix = KeyPrefix::new("_keys");
        let entry = region_entry_key("orders", &namespaced_key(&prefix, "x"));
        assert_ne!(entry, region_tracking_key("orders"));
        assert!(!entry.contains(":_keys"));
    }

    #[test]
    fn test_extract_region_from_key() {
        assert_eq!(
            extract_region_from_key("cache:{orders}:local:1"),
            Some("orders")
        );
        assert_eq!(extract_region_from_key("cache:orders:1"), None);
        assert_eq!(extract_region_from_key("other:{orders}:1"), None);
    }

    #[test]
    fn test_validate_region_name_accepts_dotted_names() {
        assert!(validate_region_name("orders").is_ok());
        assert!(validate_region_name("orders.items").is_ok());
        assert!(validate_region_name("order_items").is_ok());
    }

    #[test]
    fn test_validate_region_name_rejects_hash_tag_breakers() {
        for name in ["", "a{b", "a}b", "a:b", "a*", "a b", "a?"] {
            assert!(
                matches!(
                    validate_region_name(name),
                    Err(CacheError::InvalidRegion { .. })
                ),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_validate_region_name_rejects_long_names() {
        let name = "r".repeat(MAX_REGION_NAME_LEN + 1);
        assert!(validate_region_name(&name).is_err());
    }
}
