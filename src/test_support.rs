// Fixtures shared by the unit tests.
use crate::config::Config;
use crate::core_ftpcommand::Reply;
use crate::core_network::port::{DataConnectionInitiator, PendingConnection};
use crate::core_network::ControlConnection;
use crate::server::ServerContext;
use crate::session::{AttributeValue, LoginState, SessionKey};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub(crate) const BOB_PASSWORD: &str = "secret";

pub(crate) struct TestServer {
    pub dir: TempDir,
    pub context: Arc<ServerContext>,
}

impl TestServer {
    /// Real path below the users directory.
    pub fn path(&self, relative: &str) -> String {
        format!("{}/{}", self.root(), relative)
    }

    pub fn root(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }
}

pub(crate) fn test_server() -> TestServer {
    test_server_with("")
}

/// Users `anonymous` (default, no password) and `bob`. `bob_home` is appended to bob's
/// table; `{root}` in it stands for the users directory.
pub(crate) fn test_server_with(bob_home: &str) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().into_owned();
    std::fs::create_dir(dir.path().join("bob")).unwrap();
    std::fs::create_dir(dir.path().join("anonymous")).unwrap();

    let hash = bcrypt::hash(BOB_PASSWORD, 4).unwrap();
    let text = format!(
        r#"
        [server]
        pasv_address = "127.0.0.1"
        data_bind_address = "127.0.0.1"
        data_ports = [0, 0]
        idle_timeout_secs = 0

        [file_system]
        users_path = "{root}"

        [[file_system.users]]
        username = "anonymous"
        default = true

        [[file_system.users]]
        username = "bob"
        password_hash = "{hash}"
        {home}
        "#,
        root = root,
        hash = hash,
        home = bob_home.replace("{root}", &root),
    );

    let config = Config::from_toml_str(&text).unwrap();
    let context = Arc::new(ServerContext::new(config).unwrap());
    TestServer { dir, context }
}

#[derive(Debug, Default)]
struct MockState {
    target: Option<SocketAddr>,
    activations: usize,
    active: bool,
}

/// Records activations instead of connecting anywhere.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockInitiator {
    state: Arc<Mutex<MockState>>,
}

impl MockInitiator {
    pub fn activations(&self) -> usize {
        self.state.lock().unwrap().activations
    }

    pub fn target(&self) -> Option<SocketAddr> {
        self.state.lock().unwrap().target
    }
}

impl DataConnectionInitiator for MockInitiator {
    fn set_target(&mut self, target: SocketAddr) {
        self.state.lock().unwrap().target = Some(target);
    }

    fn target(&self) -> Option<SocketAddr> {
        self.state.lock().unwrap().target
    }

    fn activate(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.activations += 1;
        state.active = true;
    }

    fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    fn take_connection(&mut self) -> Option<PendingConnection> {
        self.state.lock().unwrap().active = false;
        None
    }

    fn abort(&mut self) {
        self.state.lock().unwrap().active = false;
    }
}

/// A context over the same users directory with an edited configuration.
pub(crate) fn context_with(
    server: &TestServer,
    edit: impl FnOnce(&mut Config),
) -> Arc<ServerContext> {
    let mut config = server.context.config.clone();
    edit(&mut config);
    Arc::new(ServerContext::new(config).unwrap())
}

pub(crate) fn connection(
    server: &TestServer,
) -> (ControlConnection, UnboundedReceiver<Reply>, MockInitiator) {
    connection_to(&server.context)
}

pub(crate) fn connection_to(
    context: &Arc<ServerContext>,
) -> (ControlConnection, UnboundedReceiver<Reply>, MockInitiator) {
    let initiator = MockInitiator::default();
    let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
    let (conn, replies) = ControlConnection::new(
        context.next_connection_id(),
        Some(peer),
        Arc::clone(context),
        Box::new(initiator.clone()),
    );
    (conn, replies, initiator)
}

pub(crate) fn login(conn: &mut ControlConnection, account: &str) {
    conn.session_mut().set_attribute(
        SessionKey::LoginState,
        AttributeValue::Login(LoginState {
            username: account.to_string(),
            account: account.to_string(),
        }),
    );
}

/// Wire text of every queued reply.
pub(crate) fn drain(replies: &mut UnboundedReceiver<Reply>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(reply) = replies.try_recv() {
        lines.push(reply.to_wire());
    }
    lines
}

/// Code of the last queued reply.
pub(crate) fn last_code(replies: &mut UnboundedReceiver<Reply>) -> String {
    drain(replies)
        .last()
        .map(|line| line[..3].to_string())
        .unwrap_or_default()
}
