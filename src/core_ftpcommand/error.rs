use thiserror::Error;

/// A fault while executing a command. The client only sees a 451 reply.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid passive address: {0}")]
    InvalidPasvAddress(String),

    #[error("No handler registered for command {0}")]
    Unregistered(String),
}
