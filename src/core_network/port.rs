use crate::constants::REPLY_SYNTAX_ERROR;
use crate::core_ftpcommand::utils::test_login;
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::pool::Connection;
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, DataOpenerType, SessionKey};
use log::{debug, error, info, warn};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type PendingConnection = JoinHandle<std::io::Result<TcpStream>>;

/// Opens the data connection towards the client in active (PORT) mode.
pub trait DataConnectionInitiator: Send {
    fn set_target(&mut self, target: SocketAddr);

    fn target(&self) -> Option<SocketAddr>;

    /// Starts connecting to the target in the background.
    fn activate(&mut self);

    fn is_active(&self) -> bool;

    /// Hands the connection attempt over to the transfer, leaving the initiator inactive.
    fn take_connection(&mut self) -> Option<PendingConnection>;

    /// Drops any connection attempt in progress.
    fn abort(&mut self);
}

#[derive(Debug, Default)]
pub struct TcpDataConnectionInitiator {
    target: Option<SocketAddr>,
    pending: Option<PendingConnection>,
}

impl TcpDataConnectionInitiator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataConnectionInitiator for TcpDataConnectionInitiator {
    fn set_target(&mut self, target: SocketAddr) {
        self.target = Some(target);
    }

    fn target(&self) -> Option<SocketAddr> {
        self.target
    }

    fn activate(&mut self) {
        self.abort();
        let Some(target) = self.target else {
            warn!("Data connection initiator activated without a target");
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                debug!("Connecting to {} for active mode transfer", target);
                self.pending = Some(handle.spawn(TcpStream::connect(target)));
            }
            Err(e) => error!("No runtime to connect to {}: {}", target, e),
        }
    }

    fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    fn take_connection(&mut self) -> Option<PendingConnection> {
        self.pending.take()
    }

    fn abort(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

/// Handles the PORT (Active Mode) FTP command.
///
/// Only records the target; the connection is opened when a transfer command needs it.
pub fn handle_port_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    if let Err(reply) = test_login(command, conn.session()) {
        return Ok(reply);
    }
    let Some(target) = parse_port_argument(command.parameter()) else {
        return Ok(command.reply("501", REPLY_SYNTAX_ERROR));
    };
    if let Some(peer) = conn.peer() {
        if peer.ip().to_canonical() != target.ip() {
            warn!("Refused PORT {} from {}", target, peer);
            return Ok(command.reply("500", "Illegal PORT command."));
        }
    }
    info!("Received PORT command with target {}", target);

    conn.context().listeners.release_all(conn.id());
    let initiator = conn.data_connection_initiator_mut();
    initiator.abort();
    initiator.set_target(target);

    let session = conn.session_mut();
    session.remove_attribute(&SessionKey::DataPort);
    session.set_attribute(
        SessionKey::DataOpenerType,
        AttributeValue::Opener(DataOpenerType::Port),
    );
    Ok(command.reply("200", "PORT command successful."))
}

/// Parses the `h1,h2,h3,h4,p1,p2` argument of PORT.
pub fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<u8> = arg
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.len() != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (parts[4] as u16) << 8 | parts[5] as u16;
    Some(SocketAddr::V4(SocketAddrV4::new(ip, port)))
}
