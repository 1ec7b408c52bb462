// Errors raised by connections and connection pools
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,

    #[error("Connection poisoned")]
    Poisoned,

    #[error("Connection idle for more than {0} seconds")]
    IdleTimeout(u64),

    #[error("Connection self-service panicked")]
    Panicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Connection pool {0} is destroyed")]
    Destroyed(&'static str),
}
