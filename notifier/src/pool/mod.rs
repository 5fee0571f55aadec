//! Connection and channel pooling for RabbitMQ using [`deadpool`].
//!
//! Two pools are layered on top of each other:
//! - a small [`ConnectionPool`] of broker connections
//! - a larger [`ChannelPool`] whose channels are opened on pooled connections
//!
//! Both are built once at startup as a [`BrokerPools`] and handed to whoever
//! publishes. Checked-out objects return to their pool when dropped, so a
//! failure while holding a channel never leaks it.
//!
//! Broken connections and channels fail recycling and are replaced on the next
//! acquisition, which is how the publisher recovers from broker restarts.

mod channel;
mod connection;
mod error;

use deadpool::managed::{Manager, Object, Pool, Status};
use tracing::info;

pub use channel::{BrokerConnection, ChannelManager, ChannelPool};
pub use connection::{ConnectionManager, ConnectionPool};
pub use error::Error;

/// A channel checked out of the [`ChannelPool`].
pub type PooledChannel = Object<ChannelManager>;

/// Maximum pool sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: usize,
    pub max_channels: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 2,
            max_channels: 10,
        }
    }
}

/// Build a bounded pool for any manager.
pub fn build<M: Manager>(manager: M, max_size: usize) -> Result<Pool<M>, Error> {
    Ok(Pool::builder(manager).max_size(max_size).build()?)
}

/// Process-scoped broker pools.
#[derive(Clone)]
pub struct BrokerPools {
    connections: ConnectionPool,
    channels: ChannelPool,
}

impl BrokerPools {
    /// Create both pools. No connection is opened until the first acquisition.
    pub fn new(url: impl Into<String>, settings: &PoolSettings) -> Result<Self, Error> {
        let connections = build(ConnectionManager::new(url), settings.max_connections)?;
        let channels = build(
            ChannelManager::new(connections.clone()),
            settings.max_channels,
        )?;

        info!(
            max_connections = settings.max_connections,
            max_channels = settings.max_channels,
            "rabbitmq_pools_created"
        );

        Ok(Self {
            connections,
            channels,
        })
    }

    /// Check out a channel, waiting for capacity if the pool is exhausted.
    pub async fn channel(&self) -> Result<PooledChannel, Error> {
        self.channels
            .get()
            .await
            .map_err(|e| Error::Acquire(Box::new(e)))
    }

    pub fn connection_status(&self) -> Status {
        self.connections.status()
    }

    pub fn channel_status(&self) -> Status {
        self.channels.status()
    }

    /// Close both pools. Idle objects are dropped, checked-out ones are
    /// dropped when returned.
    pub fn close(&self) {
        self.channels.close();
        self.connections.close();
        info!("rabbitmq_pools_closed");
    }
}
