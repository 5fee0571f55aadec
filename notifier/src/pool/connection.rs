use deadpool::managed::{Manager, Metrics, Pool, RecycleError, RecycleResult};
use lapin::{Connection, ConnectionProperties};
use tracing::{info, warn};

use super::Error;

/// Pool of open RabbitMQ connections.
pub type ConnectionPool = Pool<ConnectionManager>;

/// Opens connections to a single broker URL.
pub struct ConnectionManager {
    url: String,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Manager for ConnectionManager {
    type Type = Connection;
    type Error = Error;

    async fn create(&self) -> Result<Connection, Error> {
        info!(url_length = self.url.len(), "rabbitmq_connecting");

        let conn = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(Error::Connect)?;

        info!("rabbitmq_connected");
        Ok(conn)
    }

    async fn recycle(&self, conn: &mut Connection, _: &Metrics) -> RecycleResult<Error> {
        if conn.status().connected() {
            Ok(())
        } else {
            warn!("rabbitmq_connection_lost");
            Err(RecycleError::Message("connection is no longer open".into()))
        }
    }
}
