use crate::constants::REPLY_CANT_OPEN_DATA_CONNECTION;
use crate::core_ftpcommand::utils::test_login;
use crate::core_ftpcommand::{Command, CommandError, Reply};
use crate::core_network::pool::{Connection, ConnectionId};
use crate::core_network::ControlConnection;
use crate::session::{AttributeValue, DataOpenerType, SessionKey};
use log::{debug, info, trace, warn};
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Handles the PASV FTP command: leases a bound data port for the next transfer.
///
/// The port stays leased to this connection until its transfer ends, it is aborted, or the
/// client switches to PORT or asks for another PASV. With every port leased the reply is 425.
pub fn handle_pasv_command(
    command: &Command,
    conn: &mut ControlConnection,
) -> Result<Reply, CommandError> {
    if let Err(reply) = test_login(command, conn.session()) {
        return Ok(reply);
    }
    let context = Arc::clone(conn.context());
    let address = &context.config.server.pasv_address;
    let pasv_ip: Ipv4Addr = address
        .parse()
        .map_err(|_| CommandError::InvalidPasvAddress(address.clone()))?;

    if context.listeners.bound_number() == 0 {
        context.listeners.bind();
    }
    // A new PASV replaces the previous one
    context.listeners.release_all(conn.id());
    let Some(port) = context.listeners.acquire_port(conn.id()) else {
        warn!("PASV failed, no data port is free");
        return Ok(command.reply("425", REPLY_CANT_OPEN_DATA_CONNECTION));
    };

    conn.data_connection_initiator_mut().abort();
    let session = conn.session_mut();
    session.set_attribute(
        SessionKey::DataOpenerType,
        AttributeValue::Opener(DataOpenerType::Pasv),
    );
    session.set_attribute(SessionKey::DataPort, AttributeValue::Integer(port as u64));
    debug!("PASV listener set up on IP: {}, Port: {}", pasv_ip, port);

    Ok(command.reply("227", format_pasv_reply(pasv_ip, port)))
}

#[derive(Debug)]
struct DataPortListener {
    port: u16,
    listener: Option<TcpListener>,
    leased_by: Option<ConnectionId>,
}

impl DataPortListener {
    fn bind(&mut self, address: IpAddr) -> std::io::Result<bool> {
        if self.listener.is_some() {
            return Ok(false);
        }
        let listener = TcpListener::bind((address, self.port))?;
        listener.set_nonblocking(true)?;
        self.listener = Some(listener);
        Ok(true)
    }

    fn unbind(&mut self) -> bool {
        self.leased_by = None;
        self.listener.take().is_some()
    }

    fn bound_port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|addr| addr.port())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPortInfo {
    /// Port from the configuration, 0 for an ephemeral one
    pub configured_port: u16,
    pub bound_port: Option<u16>,
    pub leased_by: Option<ConnectionId>,
}

/// Listeners on the configured data ports, shared by every control connection.
#[derive(Debug)]
pub struct DataPortListenerSet {
    address: IpAddr,
    listeners: Mutex<Vec<DataPortListener>>,
    next: AtomicUsize,
}

impl DataPortListenerSet {
    pub fn new(address: IpAddr, ports: &[u16]) -> Self {
        let listeners = ports
            .iter()
            .map(|&port| DataPortListener {
                port,
                listener: None,
                leased_by: None,
            })
            .collect();
        Self {
            address,
            listeners: Mutex::new(listeners),
            next: AtomicUsize::new(0),
        }
    }

    /// Binds every listener not bound yet and returns how many got bound.
    pub fn bind(&self) -> usize {
        let mut bound = 0;
        for listener in self.entries().iter_mut() {
            match listener.bind(self.address) {
                Ok(true) => bound += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    "Failed to bind data port {} on {}: {}",
                    listener.port, self.address, e
                ),
            }
        }
        info!("{} data port listeners bound", bound);
        bound
    }

    /// Returns how many listeners got unbound.
    pub fn unbind(&self) -> usize {
        let unbound = self
            .entries()
            .iter_mut()
            .map(|l| l.unbind())
            .filter(|unbound| *unbound)
            .count();
        debug!("{} data port listeners unbound", unbound);
        unbound
    }

    pub fn bound_number(&self) -> usize {
        self.entries().iter().filter(|l| l.listener.is_some()).count()
    }

    pub fn list(&self) -> Vec<DataPortInfo> {
        self.entries()
            .iter()
            .map(|l| DataPortInfo {
                configured_port: l.port,
                bound_port: l.bound_port(),
                leased_by: l.leased_by,
            })
            .collect()
    }

    /// Leases the next free bound port to `owner`, round robin. `None` when every bound port
    /// is leased.
    pub fn acquire_port(&self, owner: ConnectionId) -> Option<u16> {
        let mut entries = self.entries();
        let total = entries.len();
        if total == 0 {
            return None;
        }
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        for offset in 0..total {
            let listener = &mut entries[(start + offset) % total];
            if listener.leased_by.is_some() {
                continue;
            }
            if let Some(port) = listener.bound_port() {
                listener.leased_by = Some(owner);
                trace!("Data port {} leased to connection {}", port, owner);
                return Some(port);
            }
        }
        None
    }

    /// Frees every port leased to `owner`. Returns how many were freed.
    pub fn release_all(&self, owner: ConnectionId) -> usize {
        let mut released = 0;
        for listener in self.entries().iter_mut() {
            if listener.leased_by == Some(owner) {
                listener.leased_by = None;
                released += 1;
            }
        }
        if released > 0 {
            trace!("{} data ports released by connection {}", released, owner);
        }
        released
    }

    /// A handle on the listener bound to `port`, for accepting one data connection.
    pub fn listener(&self, port: u16) -> Option<TcpListener> {
        self.entries()
            .iter()
            .filter(|l| l.bound_port() == Some(port))
            .find_map(|l| l.listener.as_ref().and_then(|l| l.try_clone().ok()))
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<DataPortListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Text of the 227 reply, `h1,h2,h3,h4,p1,p2` as in RFC 959.
pub fn format_pasv_reply(ip: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = ip.octets();
    format!(
        "Entering Passive Mode ({},{},{},{},{},{}).",
        h1,
        h2,
        h3,
        h4,
        port / 256,
        port % 256
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerContext;
    use crate::test_support::{connection, drain, login, test_server};

    fn loopback(ports: &[u16]) -> DataPortListenerSet {
        DataPortListenerSet::new(IpAddr::V4(Ipv4Addr::LOCALHOST), ports)
    }

    #[test]
    fn test_bind_and_unbind() {
        let set = loopback(&[0, 0]);
        assert_eq!(set.bound_number(), 0);
        assert!(set.acquire_port(1).is_none());

        assert_eq!(set.bind(), 2);
        assert_eq!(set.bind(), 0);
        assert_eq!(set.bound_number(), 2);
        assert!(set.list().iter().all(|info| info.bound_port.is_some()));

        assert_eq!(set.unbind(), 2);
        assert_eq!(set.unbind(), 0);
        assert_eq!(set.bound_number(), 0);
        assert_eq!(set.list()[0].configured_port, 0);
        assert_eq!(set.list()[0].bound_port, None);
    }

    #[test]
    fn test_ports_are_leased_exclusively() {
        let set = loopback(&[0, 0]);
        assert!(set.acquire_port(1).is_none());
        set.bind();

        let first = set.acquire_port(1).unwrap();
        let second = set.acquire_port(2).unwrap();
        assert_ne!(first, second);
        assert!(set.acquire_port(3).is_none());
        assert!(set
            .list()
            .iter()
            .any(|info| info.bound_port == Some(first) && info.leased_by == Some(1)));

        assert_eq!(set.release_all(1), 1);
        assert_eq!(set.release_all(1), 0);
        assert_eq!(set.acquire_port(3), Some(first));
        assert!(set.listener(first).is_some());
        assert!(set.listener(1).is_none());
    }

    #[test]
    fn test_unbind_drops_leases() {
        let set = loopback(&[0]);
        set.bind();
        assert!(set.acquire_port(7).is_some());
        set.unbind();
        set.bind();
        assert!(set.acquire_port(8).is_some());
    }

    #[test]
    fn test_format_pasv_reply() {
        assert_eq!(
            format_pasv_reply(Ipv4Addr::new(192, 168, 1, 2), 40001),
            "Entering Passive Mode (192,168,1,2,156,65)."
        );
    }

    #[tokio::test]
    async fn test_pasv_command() {
        let server = test_server();
        let (mut conn, mut replies, _) = connection(&server);

        conn.dispatch("PASV");
        assert!(drain(&mut replies)[0].starts_with("530"));

        login(&mut conn, "bob");
        conn.dispatch("PASV");
        let reply = drain(&mut replies).remove(0);
        assert!(reply.starts_with("227 Entering Passive Mode (127,0,0,1,"));

        let port = conn.session().integer(&SessionKey::DataPort).unwrap() as u16;
        assert!(server.context.listeners.listener(port).is_some());
        assert_eq!(
            conn.session().attribute(&SessionKey::DataOpenerType),
            Some(&AttributeValue::Opener(DataOpenerType::Pasv))
        );
    }

    #[tokio::test]
    async fn test_invalid_pasv_address_is_a_local_error() {
        let server = test_server();
        let mut config = server.context.config.clone();
        config.server.pasv_address = "not-an-address".to_string();
        let context = Arc::new(ServerContext::new(config).unwrap());
        let (mut conn, mut replies) = ControlConnection::new(
            1,
            None,
            context,
            Box::new(crate::core_network::port::TcpDataConnectionInitiator::new()),
        );
        login(&mut conn, "bob");

        conn.dispatch("PASV");
        assert_eq!(
            drain(&mut replies),
            vec!["451 Requested action aborted. Local error in processing.\r\n"]
        );
        assert!(conn.session().attribute(&SessionKey::DataOpenerType).is_none());
    }

    #[tokio::test]
    async fn test_sessions_never_share_a_data_port() {
        let server = test_server();
        let mut sessions: Vec<_> = (0..3).map(|_| connection(&server)).collect();
        for (conn, _, _) in sessions.iter_mut() {
            login(conn, "bob");
            conn.dispatch("PASV");
        }

        let codes: Vec<String> = sessions
            .iter_mut()
            .map(|(_, replies, _)| drain(replies).remove(0)[..3].to_string())
            .collect();
        assert_eq!(codes, vec!["227", "227", "425"]);
        let first = sessions[0].0.session().integer(&SessionKey::DataPort);
        let second = sessions[1].0.session().integer(&SessionKey::DataPort);
        assert_ne!(first, second);

        // Switching to PORT frees the port for the waiting session
        sessions[0].0.dispatch("PORT 127,0,0,1,4,1");
        sessions[2].0.dispatch("PASV");
        assert!(drain(&mut sessions[2].1)[0].starts_with("227"));
        assert_eq!(sessions[2].0.session().integer(&SessionKey::DataPort), first);
    }

    #[tokio::test]
    async fn test_repeated_pasv_keeps_one_lease() {
        let server = test_server();
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");
        for _ in 0..3 {
            conn.dispatch("PASV");
        }
        assert!(drain(&mut replies).iter().all(|r| r.starts_with("227")));
        let leased = server
            .context
            .listeners
            .list()
            .iter()
            .filter(|info| info.leased_by.is_some())
            .count();
        assert_eq!(leased, 1);
    }

    #[tokio::test]
    async fn test_destroyed_session_frees_its_port() {
        let server = test_server();
        let (mut conn, mut replies, _) = connection(&server);
        login(&mut conn, "bob");
        conn.dispatch("PASV");
        assert!(drain(&mut replies)[0].starts_with("227"));

        conn.destroy();
        assert!(server
            .context
            .listeners
            .list()
            .iter()
            .all(|info| info.leased_by.is_none()));
    }
}
