use std::future::Future;

use deadpool::managed::{Manager, Metrics, Pool, RecycleError, RecycleResult};
use lapin::options::ConfirmSelectOptions;
use lapin::{Channel, Connection};
use tracing::{debug, warn};

use super::{ConnectionManager, Error};

/// Pool of channels multiplexed over pooled connections.
pub type ChannelPool<M = ConnectionManager> = Pool<ChannelManager<M>>;

/// A pooled connection that channels can be opened on.
pub trait BrokerConnection: Send + Sync {
    type Channel: Send + Sync;

    fn open_channel(&self) -> impl Future<Output = Result<Self::Channel, Error>> + Send;

    fn channel_is_open(channel: &Self::Channel) -> bool;
}

impl BrokerConnection for Connection {
    type Channel = Channel;

    async fn open_channel(&self) -> Result<Channel, Error> {
        let channel = self.create_channel().await.map_err(Error::Channel)?;

        // Publisher confirms: a publish only succeeds once the broker has the message.
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(Error::Channel)?;

        debug!(channel_id = channel.id(), "rabbitmq_channel_created");
        Ok(channel)
    }

    fn channel_is_open(channel: &Channel) -> bool {
        channel.status().connected()
    }
}

/// Opens channels on connections borrowed from a connection pool.
///
/// The connection is only held while the channel is being opened; the channel
/// keeps the underlying socket alive on its own afterwards.
pub struct ChannelManager<M: Manager = ConnectionManager> {
    connections: Pool<M>,
}

impl<M: Manager> std::fmt::Debug for ChannelManager<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager").finish_non_exhaustive()
    }
}

impl<M: Manager> ChannelManager<M> {
    pub fn new(connections: Pool<M>) -> Self {
        Self { connections }
    }
}

impl<M> Manager for ChannelManager<M>
where
    M: Manager<Error = Error>,
    M::Type: BrokerConnection,
{
    type Type = <M::Type as BrokerConnection>::Channel;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type, Error> {
        let conn = self
            .connections
            .get()
            .await
            .map_err(|e| Error::Acquire(Box::new(e)))?;

        conn.open_channel().await
    }

    async fn recycle(&self, channel: &mut Self::Type, _: &Metrics) -> RecycleResult<Error> {
        if <M::Type as BrokerConnection>::channel_is_open(channel) {
            Ok(())
        } else {
            warn!("rabbitmq_channel_lost");
            Err(RecycleError::Message("channel is no longer open".into()))
        }
    }
}
