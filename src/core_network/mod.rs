pub mod control;
pub mod data;
pub mod data_mode;
pub mod error;
pub mod network;
pub mod pasv;
pub mod pool;
pub mod port;

pub use control::{ControlConnection, ProtocolState};
pub use data::DataConnection;
pub use data_mode::DataConnectionMode;
pub use error::{ConnectionError, PoolError};
pub use pool::{Connection, ConnectionId, ConnectionPool, SharedConnection};
pub use port::{DataConnectionInitiator, TcpDataConnectionInitiator};
