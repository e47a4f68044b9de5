//! Deployment-scoped key prefixes.
//!
//! Two deployments sharing a cache cluster during a rolling upgrade must never
//! read each other's entries, because the serialized shape of a cached value
//! may change between builds. Every logical key is therefore prefixed with a
//! value derived from build metadata.

use std::fmt::{self, Write};

/// Prefix used when no build metadata is available (local development).
///
/// Deployments running with this prefix share cache entries with each other.
pub const PLACEHOLDER_PREFIX: &str = "local";

/// A sanitized, deployment-specific key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Creates a prefix from an arbitrary string.
    ///
    /// Bytes outside `[A-Za-z0-9.+-]` are percent-encoded (`:` becomes
    /// `%3A`), so the prefix can never break the key layout (no colons,
    /// braces or leading `_`) and distinct inputs keep distinct prefixes.
    /// An empty input yields the placeholder prefix.
    pub fn new(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Self::placeholder();
        }

        let mut encoded = String::with_capacity(trimmed.len());
        for byte in trimmed.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'+' | b'-') {
                encoded.push(char::from(byte));
            } else {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }

        Self(encoded)
    }

    /// Derives the prefix from build metadata.
    ///
    /// Precedence: git commit, then an externally supplied build id. The
    /// package version alone does not distinguish two builds of the same
    /// version, so without either identifier the placeholder is used.
    pub fn from_build(version: &str, git_sha: Option<&str>, build_id: Option<&str>) -> Self {
        let identifier = git_sha
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| build_id.map(str::trim).filter(|s| !s.is_empty()));

        match identifier {
            Some(id) => Self::new(format!("{version}+{id}")),
            None => Self::placeholder(),
        }
    }

    /// Returns the placeholder prefix.
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_PREFIX.to_string())
    }

    /// Returns true if this is the placeholder prefix.
    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_PREFIX
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
