use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Publish failed: {0}")]
    PublishFailed(String),
    #[error("Invalid region name '{name}': {reason}")]
    InvalidRegion { name: String, reason: &'static str },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Configuration errors detected while building a cache topology.
///
/// None of the variants carry a raw endpoint URI, so credentials embedded in
/// configuration never reach error messages or logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("No cache servers configured")]
    NoServers,
    #[error("Single-server mode selected but {0} server addresses were configured")]
    SingleWithMultipleServers(usize),
    #[error("Invalid cache server URI at position {position}: {reason}")]
    InvalidUri { position: usize, reason: String },
    #[error("Unsupported cache URI scheme '{0}' (expected 'redis')")]
    UnsupportedScheme(String),
    #[error("Malformed credential in cache server URI: {0}")]
    MalformedCredential(&'static str),
    #[error("Invalid pool settings: {0}")]
    InvalidPoolSettings(String),
    #[error("Invalid cluster flag '{0}' (expected true/false, yes/no, on/off or 1/0)")]
    InvalidClusterFlag(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
