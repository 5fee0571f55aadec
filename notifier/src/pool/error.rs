use deadpool::managed::{BuildError, PoolError};
use thiserror::Error;

/// Errors raised while creating or acquiring pooled broker resources.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to RabbitMQ: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to open channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("failed to acquire pooled resource: {0}")]
    Acquire(#[source] Box<PoolError<Error>>),

    #[error("failed to build pool: {0}")]
    Build(#[from] BuildError),
}
