use super::data_mode::DataConnectionMode;
use super::error::ConnectionError;
use super::pool::{Connection, ConnectionId};
use log::debug;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOpener {
    /// Accept the client on this bound data port
    Passive { port: u16 },
    /// Use the connection started by the initiator
    Active,
}

/// A transfer a command prepared; the network layer runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub mode: DataConnectionMode,
    pub opener: DataOpener,
    /// Real path of the file to read or write
    pub path: String,
    pub append: bool,
    /// Listing text sent by LIST
    pub listing: Option<String>,
}

impl PendingTransfer {
    pub fn file(mode: DataConnectionMode, opener: DataOpener, path: impl Into<String>) -> Self {
        Self {
            mode,
            opener,
            path: path.into(),
            append: false,
            listing: None,
        }
    }

    pub fn listing(opener: DataOpener, listing: String) -> Self {
        Self {
            mode: DataConnectionMode::List,
            opener,
            path: String::new(),
            append: false,
            listing: Some(listing),
        }
    }

    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }
}

/// A running transfer kept in the data connection pool.
#[derive(Debug)]
pub struct DataConnection {
    id: ConnectionId,
    mode: DataConnectionMode,
    task: JoinHandle<()>,
    poisoned: bool,
    destroyed: bool,
}

impl DataConnection {
    pub fn new(id: ConnectionId, mode: DataConnectionMode, task: JoinHandle<()>) -> Self {
        Self {
            id,
            mode,
            task,
            poisoned: false,
            destroyed: false,
        }
    }

    pub fn mode(&self) -> DataConnectionMode {
        self.mode
    }
}

impl Connection for DataConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn service(&mut self) -> Result<(), ConnectionError> {
        if self.destroyed || self.task.is_finished() {
            return Err(ConnectionError::Closed);
        }
        if self.poisoned {
            debug!("Aborting {:?} transfer {}", self.mode, self.id);
            self.task.abort();
            return Err(ConnectionError::Poisoned);
        }
        Ok(())
    }

    fn poison(&mut self) {
        self.poisoned = true;
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn destroy(&mut self) {
        self.task.abort();
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
