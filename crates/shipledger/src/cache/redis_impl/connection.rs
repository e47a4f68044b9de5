//! Client construction and the initial handshake.

use std::future::Future;
use std::time::Duration;

use fred::clients::SubscriberClient;
use fred::prelude::*;
use futures_util::future::try_join_all;

use shipledger_core::cache::{CacheError, CacheTopology, Result, ServerLayout};

use super::error::map_fred_error;

/// Attempts per command before the client gives up, reconnecting in between.
const MAX_COMMAND_ATTEMPTS: u32 = 3;

/// Reconnect backoff bounds, in milliseconds.
const RECONNECT_MIN_DELAY_MS: u32 = 100;
const RECONNECT_MAX_DELAY_MS: u32 = 30_000;

/// Live connections to the cache deployment.
pub struct Connections {
    pub pool: Pool,
    pub subscribers: Vec<SubscriberClient>,
}

/// Builds the client configuration for a topology.
///
/// The returned value contains the password in clear; it must never be
/// logged.
pub fn client_config(topology: &CacheTopology) -> Config {
    let server = match &topology.layout {
        ServerLayout::Single(endpoint) => {
            ServerConfig::new_centralized(endpoint.host.as_str(), endpoint.port)
        }
        ServerLayout::Cluster(endpoints) => ServerConfig::new_clustered(
            endpoints
                .iter()
                .map(|endpoint| (endpoint.host.clone(), endpoint.port))
                .collect(),
        ),
    };

    let credential = topology.credential.as_ref();

    Config {
        server,
        fail_fast: true,
        username: credential.and_then(|c| c.username().map(str::to_string)),
        password: credential.map(|c| c.password().to_string()),
        ..Default::default()
    }
}

/// Opens the command pool and the subscriber connections.
///
/// # Errors
///
/// Returns `CacheError::ConnectionFailed` if any connection cannot complete
/// its handshake within `timeout`. There is no fallback: the caller is
/// expected to abort startup.
pub async fn connect(topology: &CacheTopology, timeout: Duration) -> Result<Connections> {
    let mut builder = Builder::from_config(client_config(topology));
    builder
        .with_connection_config(|config| {
            config.connection_timeout = timeout;
            config.max_command_attempts = MAX_COMMAND_ATTEMPTS;
        })
        .set_policy(ReconnectPolicy::new_exponential(
            0,
            RECONNECT_MIN_DELAY_MS,
            RECONNECT_MAX_DELAY_MS,
            2,
        ));

    let pool = builder
        .build_pool(topology.pool.connection_pool_size)
        .map_err(map_fred_error)?;
    let subscribers = (0..topology.pool.subscription_pool_size)
        .map(|_| builder.build_subscriber_client())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(map_fred_error)?;

    tracing::info!(
        topology = %topology,
        pool_size = topology.pool.connection_pool_size,
        subscription_pool_size = subscribers.len(),
        "Connecting to cache"
    );

    handshake(pool.init(), timeout).await?;
    try_join_all(
        subscribers
            .iter()
            .map(|subscriber| handshake(subscriber.init(), timeout)),
    )
    .await?;

    // Re-subscribe to every channel after a reconnect.
    for subscriber in &subscribers {
        let _ = subscriber.manage_subscriptions();
    }

    // The pool connects every connection eagerly, so the idle floor is met
    // once the handshake succeeds.
    tracing::debug!(
        minimum_idle_connections = topology.pool.minimum_idle_connections,
        connected = topology.pool.connection_pool_size,
        "Cache connection pool ready"
    );

    Ok(Connections { pool, subscribers })
}

async fn handshake<T, F>(init: F, timeout: Duration) -> Result<T>
where
    F: Future<Output = std::result::Result<T, fred::error::Error>>,
{
    match tokio::time::timeout(timeout, init).await {
        Ok(result) => result.map_err(map_fred_error),
        Err(_) => Err(CacheError::ConnectionFailed(format!(
            "handshake did not complete within {}s",
            timeout.as_secs()
        ))),
    }
}
