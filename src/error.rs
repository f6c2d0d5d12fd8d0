//! Error types for photo-dispatch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("post not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Other(String),
}

/// Failure on the worker channel. Always fatal to the owning session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel closed by peer")]
    Closed,

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
